use mongodb::{Client, Collection, bson::doc, options::ClientOptions};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Collection name for [`crate::Event`] documents.
pub const EVENT_COLLECTION: &str = "Event";
/// Collection name for [`crate::Feedback`] documents.
pub const FEEDBACK_COLLECTION: &str = "Feedback";

pub async fn get_collection<'d, T>(client: &Client, collection_name: &str) -> Collection<T>
where
    T: Send + Sync + Deserialize<'d> + Serialize,
{
    let db = client
        .default_database()
        .expect("database needs to be defined in the URI");

    db.collection::<T>(collection_name)
}

pub async fn client(uri: &str) -> mongodb::error::Result<Client> {
    let mut client_options = ClientOptions::parse(uri).await?;

    client_options.app_name = Some(env!("CARGO_CRATE_NAME").to_string());

    let client = Client::with_options(client_options)?;

    // Ping the server so a bad URI fails at startup instead of on first write
    client
        .default_database()
        .expect("database needs to be defined in the URI")
        .run_command(doc! {"ping": 1})
        .await?;

    debug!("mongodb connection established");

    Ok(client)
}
