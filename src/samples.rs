use crate::types::Sex;
use anyhow::{bail, Context, Result};
use log::warn;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

fn name_index(sample_names: &[String]) -> HashMap<&str, usize> {
    sample_names
        .iter()
        .enumerate()
        .map(|(i, n)| (n.as_str(), i))
        .collect()
}

fn parse_sex_token(token: &str) -> Option<Sex> {
    match token {
        "M" | "m" | "1" => Some(Sex::Male),
        "F" | "f" | "2" => Some(Sex::Female),
        "U" | "u" | "0" => Some(Sex::Unknown),
        _ => None,
    }
}

/// Parses sex-file content: one `NAME SEX` pair per whitespace-separated
/// line. Samples not listed stay Unknown; listed names absent from the
/// header only warn.
pub fn parse_sex_lines<'a, I>(lines: I, sample_names: &[String]) -> Result<Vec<Sex>>
where
    I: IntoIterator<Item = &'a str>,
{
    let index = name_index(sample_names);
    let mut sex = vec![Sex::Unknown; sample_names.len()];
    for (lineno, line) in lines.into_iter().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace();
        let (Some(name), Some(token)) = (fields.next(), fields.next()) else {
            bail!("malformed sex file line {}: {:?}", lineno + 1, line);
        };
        let Some(value) = parse_sex_token(token) else {
            bail!("unrecognised sex {:?} on line {}", token, lineno + 1);
        };
        match index.get(name) {
            Some(&i) => sex[i] = value,
            None => warn!("sex file sample {:?} not present in the header", name),
        }
    }
    Ok(sex)
}

pub fn load_sex_file(path: &Path, sample_names: &[String]) -> Result<Vec<Sex>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read sex file {}", path.display()))?;
    parse_sex_lines(content.lines(), sample_names)
        .with_context(|| format!("failed to parse sex file {}", path.display()))
}

/// Resolves an explicit sample list to an inclusion mask over the header
/// sample order. Unknown names are fatal unless `force` downgrades them to
/// warnings.
pub fn resolve_subset(
    listed: &[&str],
    exclude: bool,
    force: bool,
    sample_names: &[String],
) -> Result<Vec<bool>> {
    let index = name_index(sample_names);
    let mut mask = vec![exclude; sample_names.len()];
    for name in listed {
        match index.get(name) {
            Some(&i) => mask[i] = !exclude,
            None if force => {
                warn!("subset sample {:?} does not exist in the header, skipping", name)
            }
            None => bail!(
                "subset sample {:?} does not exist in the header \
                 (use --force-samples to ignore)",
                name
            ),
        }
    }
    if !mask.iter().any(|&m| m) {
        bail!("subsetting has removed all samples");
    }
    Ok(mask)
}

/// Builds the statistics mask from the `-s`/`-S` surface: a comma-separated
/// list or a file of names, with a leading `^` for exclusion.
pub fn sample_mask(
    list: &str,
    is_file: bool,
    force: bool,
    sample_names: &[String],
) -> Result<Vec<bool>> {
    let (exclude, names) = match list.strip_prefix('^') {
        Some(rest) => (true, rest),
        None => (false, list),
    };
    if is_file {
        let content = fs::read_to_string(names)
            .with_context(|| format!("failed to read samples file {}", names))?;
        let listed: Vec<&str> = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        resolve_subset(&listed, exclude, force, sample_names)
    } else {
        let listed: Vec<&str> = names.split(',').filter(|s| !s.is_empty()).collect();
        resolve_subset(&listed, exclude, force, sample_names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_sex_lines() {
        let samples = names(&["NA1", "NA2", "NA3"]);
        let sex = parse_sex_lines(["NA1\tM", "NA3 F", "", "# comment"], &samples).unwrap();
        assert_eq!(sex, vec![Sex::Male, Sex::Unknown, Sex::Female]);
    }

    #[test]
    fn test_parse_sex_numeric_codes() {
        let samples = names(&["NA1", "NA2"]);
        let sex = parse_sex_lines(["NA1 1", "NA2 2"], &samples).unwrap();
        assert_eq!(sex, vec![Sex::Male, Sex::Female]);
    }

    #[test]
    fn test_parse_sex_unknown_sample_warns_only() {
        let samples = names(&["NA1"]);
        let sex = parse_sex_lines(["NA9 M"], &samples).unwrap();
        assert_eq!(sex, vec![Sex::Unknown]);
    }

    #[test]
    fn test_parse_sex_rejects_garbage() {
        let samples = names(&["NA1"]);
        assert!(parse_sex_lines(["NA1 male?"], &samples).is_err());
        assert!(parse_sex_lines(["NA1"], &samples).is_err());
    }

    #[test]
    fn test_subset_include() {
        let samples = names(&["A", "B", "C"]);
        let mask = resolve_subset(&["A", "C"], false, false, &samples).unwrap();
        assert_eq!(mask, vec![true, false, true]);
    }

    #[test]
    fn test_subset_exclude() {
        let samples = names(&["A", "B", "C"]);
        let mask = resolve_subset(&["B"], true, false, &samples).unwrap();
        assert_eq!(mask, vec![true, false, true]);
    }

    #[test]
    fn test_subset_unknown_sample_is_fatal() {
        let samples = names(&["A"]);
        assert!(resolve_subset(&["Z"], false, false, &samples).is_err());
    }

    #[test]
    fn test_subset_unknown_sample_forced() {
        let samples = names(&["A", "B"]);
        let mask = resolve_subset(&["A", "Z"], false, true, &samples).unwrap();
        assert_eq!(mask, vec![true, false]);
    }

    #[test]
    fn test_subset_removing_everything_is_fatal() {
        let samples = names(&["A"]);
        assert!(resolve_subset(&["A"], true, false, &samples).is_err());
    }

    #[test]
    fn test_mask_spec_parsing() {
        let samples = names(&["A", "B", "C"]);
        let mask = sample_mask("^B,C", false, false, &samples).unwrap();
        assert_eq!(mask, vec![true, false, false]);
        let mask = sample_mask("A,B", false, false, &samples).unwrap();
        assert_eq!(mask, vec![true, true, false]);
    }
}
