//! Declarative selection policies
//!
//! The labeling engine is configured entirely through raster artifacts
//! under the `connected-components:` prefix. Values are parsed as
//! float ranges (`"min max"`, `"min-max"`, or a single open-ended
//! minimum), id lists (`"2,5-7,-1"` where `-` separates a range but a
//! leading `-` counts from the end of the table), semicolon-separated
//! color lists, or booleans. Each policy marks qualifying objects for
//! merging; the designated background object is never marked.

use std::collections::BTreeSet;

use pictor_core::{Pixel, QUANTUM_RANGE, Raster, fuzzy_equivalent};

use crate::conncomp::CcObject;
use crate::error::{VisionError, VisionResult};

const PREFIX: &str = "connected-components";

/// One entry of an id list, unresolved until the object count is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdEntry {
    Single(usize),
    Range(usize, usize),
    /// Negative offset from the end of the object table.
    FromEnd(i64),
}

/// Parsed policy set for one labeling run.
pub(crate) struct Policies {
    pub background_id: Option<usize>,
    area: Option<(f64, f64)>,
    keep_colors: Option<Vec<Pixel>>,
    keep_ids: Option<Vec<IdEntry>>,
    keep_top: Option<usize>,
    remove_colors: Option<Vec<Pixel>>,
    remove_ids: Option<Vec<IdEntry>>,
    perimeter: Option<(f64, f64)>,
    circularity: Option<(f64, f64)>,
    diameter: Option<(f64, f64)>,
    major_axis: Option<(f64, f64)>,
    minor_axis: Option<(f64, f64)>,
    eccentricity: Option<(f64, f64)>,
    angle: Option<(f64, f64)>,
    pub mean_color: bool,
    pub verbose: bool,
    pub exclude_header: bool,
}

fn invalid(name: &str, value: &str) -> VisionError {
    VisionError::InvalidArtifact {
        key: format!("{PREFIX}:{name}"),
        value: value.to_string(),
    }
}

impl Policies {
    pub fn from_artifacts(raster: &Raster) -> VisionResult<Self> {
        let lookup = |name: &str| raster.artifact(&format!("{PREFIX}:{name}"));
        let range = |name: &str| -> VisionResult<Option<(f64, f64)>> {
            match lookup(name) {
                None => Ok(None),
                Some(value) => match parse_range(value) {
                    Some(bounds) => Ok(Some(bounds)),
                    None => Err(invalid(name, value)),
                },
            }
        };
        let ids = |name: &str, alias: &str| -> VisionResult<Option<Vec<IdEntry>>> {
            match lookup(name).or_else(|| lookup(alias)) {
                None => Ok(None),
                Some(value) => match parse_ids(value) {
                    Some(entries) => Ok(Some(entries)),
                    None => Err(invalid(name, value)),
                },
            }
        };
        let colors = |name: &str| -> VisionResult<Option<Vec<Pixel>>> {
            match lookup(name) {
                None => Ok(None),
                Some(value) => match parse_colors(value) {
                    Some(list) => Ok(Some(list)),
                    None => Err(invalid(name, value)),
                },
            }
        };
        let background_id = match lookup("background-id") {
            None => None,
            Some(value) => Some(
                value
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| invalid("background-id", value))?,
            ),
        };
        let keep_top = match lookup("keep-top") {
            None => None,
            Some(value) => Some(
                value
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| invalid("keep-top", value))?,
            ),
        };
        Ok(Policies {
            background_id,
            area: range("area-threshold")?,
            keep_colors: colors("keep-colors")?,
            keep_ids: ids("keep-ids", "keep")?,
            keep_top,
            remove_colors: colors("remove-colors")?,
            remove_ids: ids("remove-ids", "remove")?,
            perimeter: range("perimeter-threshold")?,
            circularity: range("circularity-threshold")?,
            diameter: range("diameter-threshold")?,
            major_axis: range("major-axis-threshold")?,
            minor_axis: range("minor-axis-threshold")?,
            eccentricity: range("eccentricity-threshold")?,
            angle: range("angle-threshold")?,
            mean_color: lookup("mean-color").is_some_and(parse_boolean),
            verbose: lookup("verbose").is_some_and(parse_boolean),
            exclude_header: lookup("exclude-header").is_some_and(parse_boolean),
        })
    }

    /// Does any configured policy need the shape-metric pass?
    pub fn needs_metrics(&self) -> bool {
        self.perimeter.is_some()
            || self.circularity.is_some()
            || self.diameter.is_some()
            || self.major_axis.is_some()
            || self.minor_axis.is_some()
            || self.eccentricity.is_some()
            || self.angle.is_some()
    }

    /// Mark qualifying objects for merging, in the fixed policy order.
    pub fn apply(&self, objects: &mut [CcObject], background: usize, fuzz: f64) {
        let count = objects.len();
        if let Some((minimum, maximum)) = self.area {
            for object in objects.iter_mut() {
                if object.id == background {
                    continue;
                }
                if object.area < minimum || object.area > maximum {
                    object.merge = true;
                }
            }
        }
        if let Some(colors) = &self.keep_colors {
            for object in objects.iter_mut() {
                if object.id == background {
                    continue;
                }
                if !colors
                    .iter()
                    .any(|color| fuzzy_equivalent(color, &object.color, fuzz))
                {
                    object.merge = true;
                }
            }
        }
        if let Some(entries) = &self.keep_ids {
            let ids = resolve_ids(entries, count);
            for object in objects.iter_mut() {
                if object.id == background {
                    continue;
                }
                if !ids.contains(&object.id) {
                    object.merge = true;
                }
            }
        }
        if let Some(top) = self.keep_top {
            let mut ranked: Vec<(f64, usize)> = objects
                .iter()
                .filter(|object| object.id != background)
                .map(|object| (object.area, object.id))
                .collect();
            ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
            let keep: BTreeSet<usize> = ranked.iter().take(top).map(|&(_, id)| id).collect();
            for object in objects.iter_mut() {
                if object.id == background {
                    continue;
                }
                if !keep.contains(&object.id) {
                    object.merge = true;
                }
            }
        }
        if let Some(colors) = &self.remove_colors {
            for object in objects.iter_mut() {
                if object.id == background {
                    continue;
                }
                if colors
                    .iter()
                    .any(|color| fuzzy_equivalent(color, &object.color, fuzz))
                {
                    object.merge = true;
                }
            }
        }
        if let Some(entries) = &self.remove_ids {
            let ids = resolve_ids(entries, count);
            for object in objects.iter_mut() {
                if object.id == background {
                    continue;
                }
                if ids.contains(&object.id) {
                    object.merge = true;
                }
            }
        }
        let thresholds: [(Option<(f64, f64)>, fn(&CcObject) -> f64); 7] = [
            (self.perimeter, |object| object.perimeter),
            (self.circularity, |object| object.circularity),
            (self.diameter, |object| object.diameter),
            (self.major_axis, |object| object.major_axis),
            (self.minor_axis, |object| object.minor_axis),
            (self.eccentricity, |object| object.eccentricity),
            (self.angle, |object| object.angle),
        ];
        for (bounds, metric) in thresholds {
            if let Some((minimum, maximum)) = bounds {
                for object in objects.iter_mut() {
                    if object.id == background {
                        continue;
                    }
                    let value = metric(object);
                    if value < minimum || value > maximum {
                        object.merge = true;
                    }
                }
            }
        }
    }
}

/// Split a `min-max` token at the range separator, leaving exponent
/// signs like `1e-3` intact.
fn split_range(token: &str) -> Option<(&str, &str)> {
    let bytes = token.as_bytes();
    for (index, &byte) in bytes.iter().enumerate().skip(1) {
        if byte == b'-' && bytes[index - 1] != b'e' && bytes[index - 1] != b'E' {
            return Some((&token[..index], &token[index + 1..]));
        }
    }
    None
}

/// Parse a float range. A single value is an open-ended minimum.
fn parse_range(value: &str) -> Option<(f64, f64)> {
    let tokens: Vec<&str> = value.split_whitespace().collect();
    match tokens.as_slice() {
        [minimum, maximum] => Some((minimum.parse().ok()?, maximum.parse().ok()?)),
        [single] => {
            if let Some((minimum, maximum)) = split_range(single) {
                Some((minimum.parse().ok()?, maximum.parse().ok()?))
            } else {
                Some((single.parse().ok()?, f64::MAX))
            }
        }
        _ => None,
    }
}

fn parse_ids(value: &str) -> Option<Vec<IdEntry>> {
    let mut entries = Vec::new();
    for token in value.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if let Some(rest) = token.strip_prefix('-') {
            entries.push(IdEntry::FromEnd(-rest.parse::<i64>().ok()?));
        } else if let Some((start, end)) = token.split_once('-') {
            let start = start.trim().parse().ok()?;
            let end = end.trim().parse().ok()?;
            if start > end {
                return None;
            }
            entries.push(IdEntry::Range(start, end));
        } else {
            entries.push(IdEntry::Single(token.parse().ok()?));
        }
    }
    if entries.is_empty() { None } else { Some(entries) }
}

/// Resolve id entries against the object count. Entries that fall
/// outside the table are dropped.
fn resolve_ids(entries: &[IdEntry], count: usize) -> BTreeSet<usize> {
    let mut ids = BTreeSet::new();
    for entry in entries {
        match *entry {
            IdEntry::Single(id) => {
                if id < count {
                    ids.insert(id);
                }
            }
            IdEntry::Range(start, end) => {
                for id in start..=end {
                    if id < count {
                        ids.insert(id);
                    }
                }
            }
            IdEntry::FromEnd(offset) => {
                let id = count as i64 + offset;
                if (0..count as i64).contains(&id) {
                    ids.insert(id as usize);
                }
            }
        }
    }
    ids
}

fn parse_colors(value: &str) -> Option<Vec<Pixel>> {
    let mut colors = Vec::new();
    for token in value.split(';') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        colors.push(parse_color(token)?);
    }
    if colors.is_empty() { None } else { Some(colors) }
}

/// Hex byte scaled into the Q16 quantum range.
fn hex_channel(hex: &str, index: usize) -> Option<f64> {
    let byte = u8::from_str_radix(hex.get(index..index + 2)?, 16).ok()?;
    Some(byte as f64 * 257.0)
}

/// Parse one color: `#RRGGBB`, `#RRGGBBAA`, or an `rgb()`/`srgb()`
/// function with 0-255 components and an optional 0-1 alpha.
fn parse_color(token: &str) -> Option<Pixel> {
    if let Some(hex) = token.strip_prefix('#') {
        return match hex.len() {
            6 => Some(Pixel::rgb(
                hex_channel(hex, 0)?,
                hex_channel(hex, 2)?,
                hex_channel(hex, 4)?,
            )),
            8 => Some(Pixel::rgba(
                hex_channel(hex, 0)?,
                hex_channel(hex, 2)?,
                hex_channel(hex, 4)?,
                hex_channel(hex, 6)?,
            )),
            _ => None,
        };
    }
    let lower = token.to_ascii_lowercase();
    let body = lower
        .strip_prefix("srgba")
        .or_else(|| lower.strip_prefix("srgb"))
        .or_else(|| lower.strip_prefix("rgba"))
        .or_else(|| lower.strip_prefix("rgb"))?;
    let body = body.trim().strip_prefix('(')?.strip_suffix(')')?;
    let mut components = Vec::new();
    for part in body.split(',') {
        components.push(part.trim().parse::<f64>().ok()?);
    }
    match components.as_slice() {
        [red, green, blue] => Some(Pixel::rgb(red * 257.0, green * 257.0, blue * 257.0)),
        [red, green, blue, alpha] => Some(Pixel::rgba(
            red * 257.0,
            green * 257.0,
            blue * 257.0,
            alpha * QUANTUM_RANGE,
        )),
        _ => None,
    }
}

fn parse_boolean(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "on" | "yes" | "1"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_range_forms() {
        assert_eq!(parse_range("5 10"), Some((5.0, 10.0)));
        assert_eq!(parse_range("5-10"), Some((5.0, 10.0)));
        assert_eq!(parse_range("  410 "), Some((410.0, f64::MAX)));
        assert_eq!(parse_range("1e-3"), Some((1e-3, f64::MAX)));
        assert_eq!(parse_range("1e-3 2e-3"), Some((1e-3, 2e-3)));
        assert_eq!(parse_range("abc"), None);
        assert_eq!(parse_range("1 2 3"), None);
    }

    #[test]
    fn test_id_list() {
        let entries = parse_ids("2,5-7,-1").unwrap();
        assert_eq!(
            entries,
            vec![
                IdEntry::Single(2),
                IdEntry::Range(5, 7),
                IdEntry::FromEnd(-1)
            ]
        );
        let ids = resolve_ids(&entries, 10);
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![2, 5, 6, 7, 9]);
    }

    #[test]
    fn test_id_list_clips_to_count() {
        let entries = parse_ids("8, 3-99, -20").unwrap();
        let ids = resolve_ids(&entries, 6);
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![3, 4, 5]);
    }

    #[test]
    fn test_id_list_rejects_garbage() {
        assert!(parse_ids("7-3").is_none());
        assert!(parse_ids("x").is_none());
        assert!(parse_ids("").is_none());
    }

    #[test]
    fn test_color_list() {
        let colors = parse_colors("#ff0000; srgb(0,255,0)").unwrap();
        assert_eq!(colors.len(), 2);
        assert_relative_eq!(colors[0].red, 65535.0);
        assert_relative_eq!(colors[0].green, 0.0);
        assert_relative_eq!(colors[1].green, 65535.0);
    }

    #[test]
    fn test_color_alpha_forms() {
        let hex = parse_color("#11223380").unwrap();
        assert_relative_eq!(hex.alpha, 128.0 * 257.0);
        let functional = parse_color("srgba(255, 0, 0, 0.5)").unwrap();
        assert_relative_eq!(functional.alpha, 0.5 * 65535.0);
        assert!(parse_color("#1234").is_none());
        assert!(parse_color("hsl(1,2,3)").is_none());
    }

    #[test]
    fn test_booleans() {
        assert!(parse_boolean("true"));
        assert!(parse_boolean(" On "));
        assert!(parse_boolean("1"));
        assert!(!parse_boolean("false"));
        assert!(!parse_boolean("2"));
    }

    #[test]
    fn test_from_artifacts_validates() {
        let mut raster = Raster::new(2, 2).unwrap();
        raster.set_artifact("connected-components:area-threshold", "nope");
        assert!(matches!(
            Policies::from_artifacts(&raster),
            Err(VisionError::InvalidArtifact { .. })
        ));
        raster.set_artifact("connected-components:area-threshold", "5 10");
        raster.set_artifact("connected-components:verbose", "true");
        let policies = Policies::from_artifacts(&raster).unwrap();
        assert_eq!(policies.area, Some((5.0, 10.0)));
        assert!(policies.verbose);
        assert!(!policies.mean_color);
        assert!(!policies.needs_metrics());
    }
}
