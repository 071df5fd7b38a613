//! Shared primitive types used across the scoring core.

/// An 11-digit census tract GeoID (`SSCCCTTTTTT`).
pub type TractId = String;

/// Identifier of one ingestion run.
pub type RunId = String;

/// Length of a valid tract GeoID.
pub const TRACT_ID_LEN: usize = 11;

/// Length of the state + county FIPS prefix of a GeoID.
pub const COUNTY_FIPS_LEN: usize = 5;

/// A GeoID is valid iff it is exactly 11 ASCII digits.
pub fn is_valid_tract_id(id: &str) -> bool {
    id.len() == TRACT_ID_LEN && id.bytes().all(|b| b.is_ascii_digit())
}

/// Human-readable tract name derived from the GeoID.
///
/// The last two digits of the tract code are the decimal sub-tract suffix:
///   "25025000101" -> "Census Tract 1.01"
///   "25025010100" -> "Census Tract 101"
pub fn tract_name(id: &str) -> String {
    let id = id.trim();
    if id.len() != TRACT_ID_LEN || !id.is_ascii() {
        return format!("Tract {id}");
    }
    let tract_code = &id[COUNTY_FIPS_LEN..];
    let main_part = match tract_code[..4].parse::<u32>() {
        Ok(n) => n,
        Err(_) => return format!("Tract {id}"),
    };
    let sub_part = &tract_code[4..];
    if sub_part == "00" {
        format!("Census Tract {main_part}")
    } else {
        format!("Census Tract {main_part}.{sub_part}")
    }
}

/// State + county FIPS prefix of a GeoID, if it has one.
pub fn county_fips(id: &str) -> Option<&str> {
    if is_valid_tract_id(id) {
        Some(&id[..COUNTY_FIPS_LEN])
    } else {
        None
    }
}
