use letex_core::Paths;
use letex_storage::{DocumentStore, IdentityStore, SqliteDocumentStore};

use super::render;

pub async fn run(show: Option<usize>) -> anyhow::Result<()> {
    let paths = Paths::new();
    let Some(identity) = IdentityStore::new(&paths).current()? else {
        println!("Not signed in. Run `letex login` first.");
        return Ok(());
    };

    let store = SqliteDocumentStore::open(&paths.store_db())?;
    let threads = store.get_user_threads(&identity.uid)?;

    match show {
        None => render::print_threads(&threads),
        Some(position) => match position.checked_sub(1).and_then(|i| threads.get(i)) {
            Some(thread) => {
                println!("{}  ({})", thread.title, render::format_time(thread.updated_at));
                println!();
                render::print_messages(&thread.messages);
            }
            None => anyhow::bail!("No thread at position {} ({} saved)", position, threads.len()),
        },
    }
    Ok(())
}
