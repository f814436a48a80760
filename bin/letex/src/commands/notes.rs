use letex_core::Paths;
use letex_storage::{DocumentStore, IdentityStore, SqliteDocumentStore};

use super::render;

pub async fn run() -> anyhow::Result<()> {
    let paths = Paths::new();
    let Some(identity) = IdentityStore::new(&paths).current()? else {
        println!("Not signed in. Run `letex login` first.");
        return Ok(());
    };

    let store = SqliteDocumentStore::open(&paths.store_db())?;
    render::print_notes(&store.get_user_notes(&identity.uid)?);
    Ok(())
}
