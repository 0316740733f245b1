//! Attribute extraction from ad labels
//!
//! Campaigns, ad sets and ads carry labels named `{key=value}`. Each such label
//! becomes an attribute of the account structure row.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::graph::AdLabel;

// The pattern is a literal, compiling it cannot fail
#[allow(clippy::unwrap_used)]
fn label_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{([a-zA-Z|_]+)=([a-zA-Z|_]+)\}").unwrap())
}

/// Extract attributes from labels
///
/// Labels of the form `{campaign_type=brand}` yield `Campaign_Type => brand`: keys are
/// lower-cased and then title-cased, values are kept as they are. Labels that
/// do not match are ignored; when a key repeats the last label wins.
///
/// ```
/// use facebook_ads_downloader::graph::AdLabel;
/// use facebook_ads_downloader::labels::parse_labels;
///
/// let labels = vec![AdLabel { id: "1".into(), name: "{CHANNEL=social}".into() }];
/// assert_eq!(parse_labels(&labels)["Channel"], "social");
/// ```
pub fn parse_labels(labels: &[AdLabel]) -> BTreeMap<String, String> {
    let mut attributes = BTreeMap::new();
    for label in labels {
        if let Some(captures) = label_pattern().captures(&label.name) {
            let key = title_case(&captures[1].trim().to_lowercase());
            let value = captures[2].trim().to_string();
            attributes.insert(key, value);
        }
    }
    attributes
}

/// Upper-case the first letter of every alphabetic run, lower-case the rest
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}
