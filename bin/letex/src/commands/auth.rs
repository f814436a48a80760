use letex_core::Paths;
use letex_storage::IdentityStore;

pub async fn login(name: Option<String>, email: Option<String>) -> anyhow::Result<()> {
    let paths = Paths::new();
    paths.ensure_dirs()?;
    let identity = IdentityStore::new(&paths).sign_in(name.as_deref(), email.as_deref())?;
    println!("✓ Signed in as {}", identity.label());
    Ok(())
}

pub async fn logout() -> anyhow::Result<()> {
    IdentityStore::new(&Paths::new()).sign_out()?;
    println!("✓ Signed out");
    Ok(())
}
