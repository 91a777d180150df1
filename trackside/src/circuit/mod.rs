//! Static circuit lookup tables.
//!
//! Maps the circuit names used by the race feed to:
//!
//! - the identifier of a GeoJSON outline in the
//!   [bacinger/f1-circuits](https://github.com/bacinger/f1-circuits) dataset
//!   (`{country}-{year opened}`), and
//! - the lap length in kilometers, used to turn cumulative distance into a
//!   lap fraction.
//!
//! Lookups are case-insensitive. Unknown circuits fall back to the
//! lower-cased name (for geometry) and [`DEFAULT_LAP_LENGTH_KM`] (for length).

/// Default location of the GeoJSON circuit outlines.
pub const DEFAULT_GEOMETRY_BASE_URL: &str =
    "https://raw.githubusercontent.com/bacinger/f1-circuits/master/circuits";

/// Lap length assumed for circuits missing from [`LAP_LENGTHS_KM`].
pub const DEFAULT_LAP_LENGTH_KM: f64 = 5.0;

/// Circuit name or alias → GeoJSON identifier.
pub const CIRCUIT_ALIASES: &[(&str, &str)] = &[
    // Europe
    ("monaco", "mc-1929"),
    ("monte-carlo", "mc-1929"),
    ("monza", "it-1922"),
    ("imola", "it-1953"),
    ("mugello", "it-1914"),
    ("silverstone", "gb-1948"),
    ("spa", "be-1925"),
    ("spa-francorchamps", "be-1925"),
    ("paul-ricard", "fr-1969"),
    ("le-castellet", "fr-1969"),
    ("magny-cours", "fr-1960"),
    ("madrid", "es-2026"),
    ("hockenheim", "de-1932"),
    ("hungaroring", "hu-1986"),
    ("budapest", "hu-1986"),
    ("nurburgring", "de-1927"),
    ("nuerburgring", "de-1927"),
    ("nurburg", "de-1927"),
    ("barcelona", "es-1991"),
    ("catalunya", "es-1991"),
    ("spielberg", "at-1969"),
    ("red-bull-ring", "at-1969"),
    ("zandvoort", "nl-1948"),
    ("estoril", "pt-1972"),
    ("portimao", "pt-2008"),
    ("sochi", "ru-2014"),
    // Asia
    ("suzuka", "jp-1962"),
    ("marina-bay", "sg-2008"),
    ("singapore", "sg-2008"),
    ("shanghai", "cn-2004"),
    ("bahrain", "bh-2002"),
    ("sakhir", "bh-2002"),
    ("abu-dhabi", "ae-2009"),
    ("yas-marina", "ae-2009"),
    ("jeddah", "sa-2021"),
    ("losail", "qa-2004"),
    ("lusail", "qa-2004"),
    ("sepang", "my-1999"),
    ("istanbul", "tr-2005"),
    ("baku", "az-2016"),
    // Americas
    ("austin", "us-2012"),
    ("miami", "us-2022"),
    ("mexico-city", "mx-1962"),
    ("montreal", "ca-1978"),
    ("interlagos", "br-1940"),
    ("sao-paulo", "br-1940"),
    ("jacarepagua", "br-1977"),
    ("las-vegas", "us-2023"),
    ("indianapolis", "us-1909"),
    ("dix", "us-1956"),
    ("buenos-aires", "ar-1952"),
    // Oceania / Africa
    ("melbourne", "au-1953"),
    ("albert-park", "au-1953"),
    ("johannesburg", "za-1961"),
];

/// Circuit name or alias → lap length in kilometers (approximate).
pub const LAP_LENGTHS_KM: &[(&str, f64)] = &[
    ("japan", 5.48),
    ("suzuka", 5.48),
    ("monaco", 3.32),
    ("monte-carlo", 3.32),
    ("monza", 5.79),
    ("spa", 7.0),
    ("silverstone", 5.89),
];

/// Resolve a circuit name to its GeoJSON identifier.
///
/// Falls back to the lower-cased name itself.
pub fn resolve_locator(circuit: &str) -> String {
    let key = circuit.trim().to_lowercase();
    CIRCUIT_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, id)| id.to_string())
        .unwrap_or(key)
}

/// Build the URL of a circuit's GeoJSON outline under `base_url`.
pub fn geometry_url(base_url: &str, circuit: &str) -> String {
    format!(
        "{}/{}.geojson",
        base_url.trim_end_matches('/'),
        resolve_locator(circuit)
    )
}

/// Lap length of a circuit, if it is in the table.
pub fn known_lap_length_km(circuit: &str) -> Option<f64> {
    let key = circuit.trim().to_lowercase();
    LAP_LENGTHS_KM
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, km)| *km)
}

/// Lap length of a circuit, falling back to [`DEFAULT_LAP_LENGTH_KM`].
pub fn lap_length_km(circuit: &str) -> f64 {
    known_lap_length_km(circuit).unwrap_or(DEFAULT_LAP_LENGTH_KM)
}
