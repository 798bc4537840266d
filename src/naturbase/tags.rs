//! Naturbase attribute to OSM tag mapping.

use regex::Regex;
use tracing::warn;

use super::{NaturbaseProperties, ObjectType};
use crate::models::Tags;

/// IUCN category code to OSM `protect_class`.
///
/// `ikkeVurdert` (not assessed) is known but maps to no class.
pub fn iucn_protect_class(code: &str) -> Option<&'static str> {
    match code {
        "strictNatureReserve" => Some("1a"),
        "wildernessArea" => Some("1b"),
        "nationalPark" => Some("2"),
        "naturalMonument" => Some("3"),
        "habitatSpeciesManagementArea" => Some("4"),
        "protectedLandscapeOrSeascape" => Some("5"),
        "managedResourceProtectedArea" => Some("6"),
        "ikkeVurdert" => Some(""),
        _ => None,
    }
}

/// Protection form (verneform) to its Norwegian description
pub fn verneform_description(code: &str) -> Option<&'static str> {
    match code {
        "biotopvern" | "biotopvernSvalbard" | "biotopvernVilt" => Some("Biotopvernområde"),
        "dyrefredningsområde" => Some("Dyrefredningsområde"),
        "dyrelivsfredning" => Some("Dyrelivsfredning"),
        "geotopvernSvalbard" => Some("Geotopvernområde"),
        "landskapsvernområde" => Some("Landskapsvernområde"),
        "landskapsvernområdeBiotopvern" => Some("Landskapsvernområde med biotopvern"),
        "landskapsvernområdeDyrelivsfredning" => Some("Landskapsvernområde med dyrelivsfredning"),
        "landskapsvernområdePlantelivsfredning" => {
            Some("Landskapsvernområde med plantelivsfredning")
        }
        "landskapsvernområdePlanteOgDyrelivsfredning" => {
            Some("Landskapsvernområde med plante- og dyrelivsfredning")
        }
        "marintVerneområde" => Some("Marint verneområde"),
        "nasjonalpark" | "nasjonalparkSvalbard" => Some("Nasjonalpark"),
        "naturminne" => Some("Naturminne"),
        "naturreservat" | "naturreservatJanMayen" | "naturreservatSvalbard" => {
            Some("Naturreservat")
        }
        "plantefredningsområde" => Some("Plantefredningsområde"),
        "plantelivsfredning" => Some("Plantelivsfredning"),
        "planteOgDyrefredningsområde" => Some("Plante- og dyrefredningsområde"),
        "planteOgDyrelivsfredning" => Some("Plante- og dyrelivsfredning"),
        _ => None,
    }
}

/// Protection plan (verneplan) to its description; some plans have none
pub fn verneplan_description(code: &str) -> Option<&'static str> {
    match code {
        "verneplanNasjonalpark" => Some("Nasjonalpark"),
        "verneplanVåtmark" => Some("Våtmark"),
        "verneplanMyr" => Some("Myr"),
        "verneplanLøvskog" => Some("Løvskog"),
        "verneplanSjøfugl" => Some("Sjøfugl"),
        "skogvern" => Some("Skog"),
        "marinVerneplan" => Some("Marin"),
        "kvartærgeologi" => Some("Kvartærgeologi"),
        "fossiler" => Some("Fossiler"),
        "annetVern" | "ikkeVurdert" => Some(""),
        _ => None,
    }
}

/// Translates Naturbase properties into OSM tags
#[derive(Debug, Clone)]
pub struct TagMapper {
    spaces: Regex,
    /// Also write the raw Naturbase codes as upper-case tags
    debug: bool,
}

impl TagMapper {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            spaces: Regex::new(r" {2,}")?,
            debug: false,
        })
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Tags for an area, or `None` for object types that are not converted
    pub fn tags(&self, properties: &NaturbaseProperties) -> Option<Tags> {
        let mut tags = Tags::new();
        match properties.object_type()? {
            ObjectType::Reserve => self.tag_reserve(properties, &mut tags),
            ObjectType::Recreation => tag_recreation(properties, &mut tags),
        }
        Some(tags)
    }

    fn tag_reserve(&self, p: &NaturbaseProperties, tags: &mut Tags) {
        let short_name = p.navn.as_deref().unwrap_or("").trim().to_string();
        let verneform = p.verneform.as_deref().filter(|v| !v.is_empty());

        let mut name = match (p.offisieltnavn.as_deref(), verneform) {
            (Some(official), _) if official != short_name && official.contains(' ') => {
                official.to_string()
            }
            (_, Some(form)) => match verneform_description(form) {
                Some(description) => format!("{} {}", short_name, description.to_lowercase()),
                None => short_name.clone(),
            },
            _ => short_name.clone(),
        };
        let official_name = name.clone();

        // "X naturreservat med plantelivsfredning" is named "X naturreservat"
        if let Some(pos) = name.find(" med ") {
            if pos > 0 && !short_name.contains(" med ") && !name.contains('/') {
                name.truncate(pos);
            }
        }

        insert(tags, "name", &self.clean_name(&name));
        if !short_name.is_empty() && short_name != name {
            insert(tags, "short_name", &self.clean_name(&short_name));
        }
        if official_name != name {
            insert(tags, "official_name", &self.clean_name(&official_name));
        }

        insert_opt(tags, "naturbase:iid", &p.identifikasjon_lokalid);
        insert_opt(tags, "naturbase:url", &p.faktaark);
        insert_opt(tags, "related_law", &p.verneforskrift);
        if let Some(date) = p.vernedato.as_deref().and_then(format_date) {
            insert(tags, "start_date", &date);
        }
        if let Some(operator) = &p.forvaltningsmyndighet {
            insert(tags, "operator", &self.spaces.replace_all(operator, " "));
        }

        let iucn = p.iucn.as_deref().filter(|v| !v.is_empty());
        let mut protect_class = iucn.and_then(iucn_protect_class).unwrap_or("");
        if protect_class.is_empty() {
            if let Some(form) = verneform {
                let form = form.to_lowercase();
                if form.contains("naturreservat") {
                    protect_class = "1a";
                } else if form.contains("naturminne") {
                    protect_class = "3";
                } else if form.contains("fredning") || form.contains("biotop") {
                    protect_class = "4";
                }
            }
        }
        insert(tags, "protect_class", protect_class);

        match protect_class {
            "1a" | "1b" | "4" => {
                insert(tags, "leisure", "nature_reserve");
                insert(tags, "boundary", "protected_area");
            }
            "2" => insert(tags, "boundary", "national_park"),
            _ => insert(tags, "boundary", "protected_area"),
        }

        if let Some(description) = verneform.and_then(verneform_description) {
            insert(tags, "naturbase:verneform", description);
        }
        let verneplan = p.verneplan.as_deref().filter(|v| !v.is_empty());
        if let Some(description) = verneplan.and_then(verneplan_description) {
            insert(tags, "naturbase:verneplan", description);
        }

        if self.debug {
            insert_opt(tags, "IUCN", &p.iucn);
            insert_opt(tags, "VERNEFORM", &p.verneform);
            insert_opt(tags, "VERNEPLAN", &p.verneplan);
            insert_opt(tags, "NAVN", &p.navn);
            insert_opt(tags, "OFFISIELTNAVN", &p.offisieltnavn);
        }

        let reference = p.identifikasjon_lokalid.as_deref().unwrap_or("?");
        if let Some(code) = iucn.filter(|c| iucn_protect_class(c).is_none()) {
            warn!("IUCN code not known: {} ({})", code, reference);
        }
        if let Some(code) = verneplan.filter(|c| verneplan_description(c).is_none()) {
            warn!("Verneplan not known: {} ({})", code, reference);
        }
        if let Some(code) = verneform.filter(|c| verneform_description(c).is_none()) {
            warn!("Verneform not known: {} ({})", code, reference);
        }
    }

    /// Pad slashes and squash repeated spaces
    fn clean_name(&self, name: &str) -> String {
        self.spaces
            .replace_all(&name.replace('/', " / "), " ")
            .trim()
            .to_string()
    }
}

fn tag_recreation(p: &NaturbaseProperties, tags: &mut Tags) {
    insert(tags, "boundary", "protected_area");
    insert(tags, "protect_class", "21");
    insert_opt(tags, "naturbase:iid", &p.identifikasjon_lokalid);
    insert_opt(tags, "naturbase:url", &p.faktaark);
}

/// YYYYMMDD to YYYY-MM-DD
fn format_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let digits = raw.as_bytes().get(..8)?;
    if !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    Some(format!("{}-{}-{}", &raw[0..4], &raw[4..6], &raw[6..8]))
}

/// Empty values are never written
fn insert(tags: &mut Tags, key: &str, value: &str) {
    let value = value.trim();
    if !value.is_empty() {
        tags.insert(key.to_string(), value.to_string());
    }
}

fn insert_opt(tags: &mut Tags, key: &str, value: &Option<String>) {
    if let Some(value) = value {
        insert(tags, key, value);
    }
}
