//! Header validation for analysis files.

use crate::analytics::dataset::Column;

/// Message shown when an uploaded file is not a complete analysis file.
pub const INVALID_FILE_MESSAGE: &str = "Le fichier ne contient pas toutes les colonnes requises. Assurez-vous d'utiliser un fichier d'analyse complet généré par Genii Insights.";

/// Required columns that are absent from `headers`, in display order.
///
/// Order of `headers` and presence of optional or unknown columns do not matter.
pub fn missing_required_columns<I, S>(headers: I) -> Vec<Column>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let present: Vec<Column> = headers
        .into_iter()
        .filter_map(|header| Column::from_header(header.as_ref()))
        .collect();

    Column::REQUIRED
        .into_iter()
        .filter(|column| !present.contains(column))
        .collect()
}

/// Returns `true` if all required columns are present.
pub fn is_processed_file<I, S>(headers: I) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    missing_required_columns(headers).is_empty()
}

/// "Colonnes requises: ..." line listing every required column.
pub fn required_columns_message() -> String {
    let names: Vec<String> = Column::REQUIRED.iter().map(|c| c.to_string()).collect();
    format!("Colonnes requises: {}", names.join(", "))
}
