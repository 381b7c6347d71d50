//! Upstream JSON -> normalized records.
//!
//! Every record type is described by a [`FieldRule`] table. A rule names a
//! JSON pointer into the upstream payload (or several, joined) and the
//! sentinel to use when the value is missing, null or blank. Nothing in this
//! module fails: malformed input degrades to sentinels.

use serde_json::{Map, Value};

use crate::status::StatusPolicy;
use crate::types::{
    Apod, EarthImage, ImageSearchPage, ImageSearchResult, LaunchDetail, MissionSuccess,
    NormalizedLaunch, Pagination,
};

/// Default "not known" marker for derived text fields.
pub const UNKNOWN: &str = "Unknown";

/// Results per page reported by the image library.
const SEARCH_PAGE_SIZE: u64 = 100;

static NULL: Value = Value::Null;

#[derive(Debug, Clone, Copy)]
pub enum Source {
    Pointer(&'static str),
    /// First pointer that yields a value.
    FirstOf(&'static [&'static str]),
    /// Present parts joined with `separator`; absent parts are skipped.
    Joined {
        pointers: &'static [&'static str],
        separator: &'static str,
    },
}

#[derive(Debug, Clone, Copy)]
pub enum Fallback {
    Text(&'static str),
    Null,
}

impl Fallback {
    fn value(&self) -> Value {
        match self {
            Fallback::Text(text) => Value::String((*text).to_string()),
            Fallback::Null => Value::Null,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: &'static str,
    pub source: Source,
    pub fallback: Fallback,
}

const fn rule(field: &'static str, pointer: &'static str, fallback: Fallback) -> FieldRule {
    FieldRule {
        field,
        source: Source::Pointer(pointer),
        fallback,
    }
}

pub const LAUNCH_FIELDS: &[FieldRule] = &[
    rule("id", "/id", Fallback::Null),
    rule("name", "/name", Fallback::Text(UNKNOWN)),
    rule("status", "/status/name", Fallback::Text(UNKNOWN)),
    rule(
        "description",
        "/mission/description",
        Fallback::Text("No description available"),
    ),
    rule("launchDate", "/net", Fallback::Null),
    rule(
        "agency",
        "/launch_service_provider/name",
        Fallback::Text(UNKNOWN),
    ),
    rule("image", "/image", Fallback::Null),
    rule("missionType", "/mission/type", Fallback::Text(UNKNOWN)),
    FieldRule {
        field: "location",
        source: Source::Joined {
            pointers: &["/pad/name", "/pad/location/name"],
            separator: ", ",
        },
        fallback: Fallback::Text(UNKNOWN),
    },
    FieldRule {
        field: "missionSuccess",
        source: Source::FirstOf(&["/mission_success", "/success"]),
        fallback: Fallback::Null,
    },
];

/// Extra fields carried by the launch-by-id payload.
pub const LAUNCH_DETAIL_FIELDS: &[FieldRule] = &[
    rule(
        "rocket",
        "/rocket/configuration/name",
        Fallback::Text(UNKNOWN),
    ),
    rule(
        "details",
        "/mission/description",
        Fallback::Text("No details available"),
    ),
];

pub const APOD_FIELDS: &[FieldRule] = &[
    rule("title", "/title", Fallback::Text("Untitled")),
    rule("date", "/date", Fallback::Null),
    rule("explanation", "/explanation", Fallback::Null),
    rule("url", "/url", Fallback::Null),
    rule("hdUrl", "/hdurl", Fallback::Null),
    rule("mediaType", "/media_type", Fallback::Text("image")),
    rule("copyright", "/copyright", Fallback::Null),
];

pub const IMAGE_SEARCH_FIELDS: &[FieldRule] = &[
    rule("id", "/data/0/nasa_id", Fallback::Null),
    rule("title", "/data/0/title", Fallback::Text("Untitled")),
    rule("description", "/data/0/description", Fallback::Null),
    rule("date", "/data/0/date_created", Fallback::Null),
    rule("thumbnail", "/links/0/href", Fallback::Null),
    rule("mediaType", "/data/0/media_type", Fallback::Text("image")),
];

pub const EARTH_IMAGE_FIELDS: &[FieldRule] = &[
    rule("id", "/identifier", Fallback::Null),
    rule("caption", "/caption", Fallback::Null),
    rule("date", "/date", Fallback::Null),
    rule("image", "/image", Fallback::Null),
    rule("centroidCoordinates", "/centroid_coordinates", Fallback::Null),
];

/// Where EPIC archive images are served from.
#[derive(Debug, Clone)]
pub struct EpicArchive {
    pub base_url: String,
    pub api_key: String,
}

impl EpicArchive {
    /// `{base}/{yyyy}/{mm}/{dd}/png/{image}.png?api_key={key}`
    pub fn image_url(&self, date: &str, image: &str) -> Option<String> {
        let day = date.split_whitespace().next()?;
        if day.is_empty() || image.is_empty() {
            return None;
        }
        Some(format!(
            "{}/{}/png/{}.png?api_key={}",
            self.base_url.trim_end_matches('/'),
            day.replace('-', "/"),
            image,
            self.api_key
        ))
    }
}

/// Result of applying a rule table: every field present, fallbacks filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection(Map<String, Value>);

impl Projection {
    pub fn get(&self, field: &str) -> &Value {
        self.0.get(field).unwrap_or(&NULL)
    }

    pub fn text(&self, field: &str) -> String {
        self.opt_text(field).unwrap_or_default()
    }

    pub fn opt_text(&self, field: &str) -> Option<String> {
        scalar_text(self.get(field))
    }

    pub fn flag(&self, field: &str) -> Option<bool> {
        self.get(field).as_bool()
    }

    pub fn raw(&self, field: &str) -> Option<Value> {
        match self.get(field) {
            Value::Null => None,
            value => Some(value.clone()),
        }
    }
}

/// Apply a rule table to an upstream payload.
pub fn project(rules: &[FieldRule], raw: &Value) -> Projection {
    let mut map = Map::with_capacity(rules.len());
    for rule in rules {
        let value = resolve(&rule.source, raw).unwrap_or_else(|| rule.fallback.value());
        map.insert(rule.field.to_string(), value);
    }
    Projection(map)
}

fn resolve(source: &Source, raw: &Value) -> Option<Value> {
    match source {
        Source::Pointer(pointer) => lookup(raw, pointer),
        Source::FirstOf(pointers) => pointers.iter().find_map(|pointer| lookup(raw, pointer)),
        Source::Joined {
            pointers,
            separator,
        } => {
            let parts: Vec<String> = pointers
                .iter()
                .filter_map(|pointer| lookup(raw, pointer))
                .filter_map(|value| scalar_text(&value))
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some(Value::String(parts.join(separator)))
            }
        }
    }
}

/// Null and blank strings count as absent.
fn lookup(raw: &Value, pointer: &str) -> Option<Value> {
    match raw.pointer(pointer)? {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        value => Some(value.clone()),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn normalize_launch(raw: &Value, policy: StatusPolicy) -> NormalizedLaunch {
    let p = project(LAUNCH_FIELDS, raw);
    let status = p.text("status");

    NormalizedLaunch {
        id: p.opt_text("id"),
        name: p.text("name"),
        status_category: policy.categorize(&status),
        success: MissionSuccess::resolve(p.flag("missionSuccess"), &status),
        status,
        description: p.text("description"),
        launch_date: p.opt_text("launchDate"),
        agency: p.text("agency"),
        image: p.opt_text("image"),
        mission_type: p.text("missionType"),
        location: p.text("location"),
    }
}

/// Launches from a paged listing (`{"results": [...]}`).
pub fn normalize_launches(raw: &Value, policy: StatusPolicy) -> Vec<NormalizedLaunch> {
    items_at(raw, "/results")
        .iter()
        .map(|launch| normalize_launch(launch, policy))
        .collect()
}

pub fn normalize_launch_detail(raw: &Value, policy: StatusPolicy) -> LaunchDetail {
    let extra = project(LAUNCH_DETAIL_FIELDS, raw);
    LaunchDetail {
        launch: normalize_launch(raw, policy),
        rocket: extra.text("rocket"),
        details: extra.text("details"),
    }
}

pub fn normalize_apod(raw: &Value) -> Apod {
    let p = project(APOD_FIELDS, raw);
    Apod {
        title: p.text("title"),
        date: p.opt_text("date"),
        explanation: p.opt_text("explanation"),
        url: p.opt_text("url"),
        hd_url: p.opt_text("hdUrl"),
        media_type: p.text("mediaType"),
        copyright: p.opt_text("copyright"),
    }
}

pub fn normalize_image_result(raw: &Value) -> ImageSearchResult {
    let p = project(IMAGE_SEARCH_FIELDS, raw);
    ImageSearchResult {
        id: p.opt_text("id"),
        title: p.text("title"),
        description: p.opt_text("description"),
        date: p.opt_text("date"),
        thumbnail: p.opt_text("thumbnail"),
        media_type: p.text("mediaType"),
    }
}

pub fn normalize_image_search(raw: &Value, current_page: u32) -> ImageSearchPage {
    let items = items_at(raw, "/collection/items")
        .iter()
        .map(normalize_image_result)
        .collect();
    let total_hits = raw
        .pointer("/collection/metadata/total_hits")
        .and_then(Value::as_u64)
        .unwrap_or(0);

    ImageSearchPage {
        items,
        pagination: Pagination {
            total_pages: total_hits.div_ceil(SEARCH_PAGE_SIZE),
            current_page,
        },
    }
}

pub fn normalize_earth_image(raw: &Value, archive: &EpicArchive) -> EarthImage {
    let p = project(EARTH_IMAGE_FIELDS, raw);
    let date = p.opt_text("date");
    let image_url = match (&date, p.opt_text("image")) {
        (Some(date), Some(image)) => archive.image_url(date, &image),
        _ => None,
    };

    EarthImage {
        id: p.opt_text("id"),
        caption: p.opt_text("caption"),
        date,
        image_url,
        centroid_coordinates: p.raw("centroidCoordinates"),
    }
}

/// The EPIC listing is a bare JSON array.
pub fn normalize_earth_images(raw: &Value, archive: &EpicArchive) -> Vec<EarthImage> {
    items_at(raw, "")
        .iter()
        .map(|image| normalize_earth_image(image, archive))
        .collect()
}

fn items_at<'a>(raw: &'a Value, pointer: &str) -> &'a [Value] {
    raw.pointer(pointer)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
