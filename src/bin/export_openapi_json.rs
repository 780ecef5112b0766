use anyhow::Context;
use langprogress::api::ApiDoc;
use utoipa::OpenApi;

fn main() -> anyhow::Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or("openapi.json".to_string());
    let json = ApiDoc::openapi().to_pretty_json()?;
    std::fs::write(&path, json).with_context(|| format!("failed to write {path}"))?;
    Ok(())
}
