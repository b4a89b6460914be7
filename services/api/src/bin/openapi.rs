//! services/api/src/bin/openapi.rs
//!
//! Writes the account service's OpenAPI document. The output path is the
//! first argument and defaults to `openapi.json`.

use api_lib::web::rest::ApiDoc;
use utoipa::OpenApi;

const DEFAULT_OUTPUT: &str = "openapi.json";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_OUTPUT.to_string());
    let document = ApiDoc::openapi().to_pretty_json()?;
    std::fs::write(&path, document)?;
    println!(
        "Wrote OpenAPI document for {} paths to {}",
        ApiDoc::openapi().paths.paths.len(),
        path
    );
    Ok(())
}
