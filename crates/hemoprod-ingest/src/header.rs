//! Header row handling shared by the workbook and CSV readers.

use std::collections::HashSet;

/// Make raw header cells usable as unique column names.
///
/// Blank cells become `Unnamed: <index>` and repeated labels get a `.<n>`
/// suffix, so `["a", "", "a"]` reads as `["a", "Unnamed: 1", "a.1"]`.
/// Labels are otherwise kept verbatim; cleanup belongs to the normalizer.
pub fn unique_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(raw.len());
    let mut headers = Vec::with_capacity(raw.len());
    for (idx, label) in raw.into_iter().enumerate() {
        let base = if label.trim().is_empty() {
            format!("Unnamed: {idx}")
        } else {
            label
        };
        let mut name = base.clone();
        let mut suffix = 1usize;
        while seen.contains(&name) {
            name = format!("{base}.{suffix}");
            suffix += 1;
        }
        seen.insert(name.clone());
        headers.push(name);
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    #[test]
    fn blank_and_duplicate_headers() {
        let headers = unique_headers(owned(&["CNPJ", " ", "CNPJ", "CNPJ", "Ano"]));
        assert_eq!(headers, owned(&["CNPJ", "Unnamed: 1", "CNPJ.1", "CNPJ.2", "Ano"]));
    }

    #[test]
    fn suffix_skips_existing_names() {
        let headers = unique_headers(owned(&["a", "a.1", "a"]));
        assert_eq!(headers, owned(&["a", "a.1", "a.2"]));
    }

    #[test]
    fn labels_kept_verbatim() {
        let headers = unique_headers(owned(&[" Total Collected \u{a0}"]));
        assert_eq!(headers, owned(&[" Total Collected \u{a0}"]));
    }
}
