use super::run::{self, RunOptions};
use anyhow::Result;

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "ods"];

/// Ask for the catalog in a native file dialog and run on the chosen file.
/// Closing the dialog without a choice is not an error.
pub fn execute(options: &RunOptions) -> Result<()> {
    let picked = rfd::FileDialog::new()
        .set_title("Choose the catalog spreadsheet")
        .add_filter("Spreadsheets", SPREADSHEET_EXTENSIONS)
        .pick_file();

    match picked {
        Some(path) => {
            println!("📄 Selected: {}", path.display());
            run::execute(&path, options)
        }
        None => {
            println!("No spreadsheet selected.");
            Ok(())
        }
    }
}
