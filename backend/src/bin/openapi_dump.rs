//! Print the notifier's OpenAPI document as pretty JSON.

use color_eyre::eyre::Result;
use lending_backend::ApiDoc;
use utoipa::OpenApi;

#[expect(clippy::print_stdout, reason = "the document is the program output")]
fn main() -> Result<()> {
    color_eyre::install()?;
    println!("{}", ApiDoc::openapi().to_pretty_json()?);
    Ok(())
}
