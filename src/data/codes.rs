//! Static code tables for the price portal.
//!
//! The portal numbers regions 1–34 in its own order; the store uses the
//! official two-digit administrative codes. Commodities arrive as display
//! names and are stored by slug.
//!
//! Anything the tables do not know is reported as `None` so the caller can
//! drop the row and keep the rest of the payload.

use std::collections::HashMap;

/// One first-level administrative region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Portal's internal region id.
    pub source_id: u32,
    /// Canonical two-digit region code.
    pub code: &'static str,
    pub name: &'static str,
}

const fn region(source_id: u32, code: &'static str, name: &'static str) -> Region {
    Region {
        source_id,
        code,
        name,
    }
}

pub const REGIONS: [Region; 34] = [
    region(1, "11", "Aceh"),
    region(2, "12", "Sumatera Utara"),
    region(3, "13", "Sumatera Barat"),
    region(4, "14", "Riau"),
    region(5, "21", "Kepulauan Riau"),
    region(6, "15", "Jambi"),
    region(7, "17", "Bengkulu"),
    region(8, "16", "Sumatera Selatan"),
    region(9, "19", "Kepulauan Bangka Belitung"),
    region(10, "18", "Lampung"),
    region(11, "36", "Banten"),
    region(12, "32", "Jawa Barat"),
    region(13, "31", "DKI Jakarta"),
    region(14, "33", "Jawa Tengah"),
    region(15, "34", "DI Yogyakarta"),
    region(16, "35", "Jawa Timur"),
    region(17, "51", "Bali"),
    region(18, "52", "Nusa Tenggara Barat"),
    region(19, "53", "Nusa Tenggara Timur"),
    region(20, "61", "Kalimantan Barat"),
    region(21, "63", "Kalimantan Selatan"),
    region(22, "62", "Kalimantan Tengah"),
    region(23, "64", "Kalimantan Timur"),
    region(24, "65", "Kalimantan Utara"),
    region(25, "75", "Gorontalo"),
    region(26, "73", "Sulawesi Selatan"),
    region(27, "74", "Sulawesi Tenggara"),
    region(28, "72", "Sulawesi Tengah"),
    region(29, "71", "Sulawesi Utara"),
    region(30, "76", "Sulawesi Barat"),
    region(31, "81", "Maluku"),
    region(32, "82", "Maluku Utara"),
    region(33, "91", "Papua"),
    region(34, "92", "Papua Barat"),
];

/// Portal display name → commodity slug.
///
/// Names are matched after trimming, which also covers the portal's
/// "Cabai Merah Keriting " variant.
pub const COMMODITIES: [(&str, &str); 21] = [
    ("Bawang Merah Ukuran Sedang", "bawang-merah-ukuran-sedang"),
    ("Bawang Putih Ukuran Sedang", "bawang-putih-ukuran-sedang"),
    ("Beras Kualitas Bawah I", "beras-kualitas-bawah-i"),
    ("Beras Kualitas Bawah II", "beras-kualitas-bawah-ii"),
    ("Beras Kualitas Medium I", "beras-kualitas-medium-i"),
    ("Beras Kualitas Medium II", "beras-kualitas-medium-ii"),
    ("Beras Kualitas Super I", "beras-kualitas-super-i"),
    ("Beras Kualitas Super II", "beras-kualitas-super-ii"),
    ("Cabai Merah Besar", "cabai-merah-besar"),
    ("Cabai Merah Keriting", "cabai-merah-keriting"),
    ("Cabai Rawit Hijau", "cabai-rawit-hijau"),
    ("Cabai Rawit Merah", "cabai-rawit-merah"),
    ("Daging Ayam Ras Segar", "daging-ayam-ras-segar"),
    ("Daging Sapi Kualitas 1", "daging-sapi-kualitas-1"),
    ("Daging Sapi Kualitas 2", "daging-sapi-kualitas-2"),
    ("Gula Pasir Kualitas Premium", "gula-pasir-kualitas-premium"),
    ("Gula Pasir Lokal", "gula-pasir-lokal"),
    ("Minyak Goreng Curah", "minyak-goreng-curah"),
    ("Minyak Goreng Kemasan Bermerk 1", "minyak-goreng-kemasan-bermerek-1"),
    ("Minyak Goreng Kemasan Bermerk 2", "minyak-goreng-kemasan-bermerek-2"),
    ("Telur Ayam Ras Segar", "telur-ayam-ras-segar"),
];

/// Top-level commodity categories accepted by the point-summary endpoint.
pub const CATEGORIES: [(u8, &str); 10] = [
    (1, "Beras"),
    (2, "Daging Ayam"),
    (3, "Daging Sapi"),
    (4, "Telur Ayam"),
    (5, "Bawang Merah"),
    (6, "Bawang Putih"),
    (7, "Cabai Merah"),
    (8, "Cabai Rawit"),
    (9, "Minyak Goreng"),
    (10, "Gula Pasir"),
];

/// Immutable lookup tables handed to the row normalizer.
#[derive(Debug, Clone)]
pub struct CodeTables {
    regions: Vec<Region>,
    by_source_id: HashMap<u32, usize>,
    slugs: HashMap<String, &'static str>,
}

impl CodeTables {
    /// Tables for the portal's current region and commodity lists.
    pub fn standard() -> Self {
        Self::new(REGIONS.to_vec(), COMMODITIES.iter().copied())
    }

    pub fn new<'a>(
        regions: Vec<Region>,
        commodities: impl IntoIterator<Item = (&'a str, &'static str)>,
    ) -> Self {
        let by_source_id = regions
            .iter()
            .enumerate()
            .map(|(idx, r)| (r.source_id, idx))
            .collect();
        let slugs = commodities
            .into_iter()
            .map(|(name, slug)| (name.trim().to_string(), slug))
            .collect();
        Self {
            regions,
            by_source_id,
            slugs,
        }
    }

    /// Canonical region code for a portal region id.
    pub fn region_code(&self, source_id: u32) -> Option<&'static str> {
        self.region(source_id).map(|r| r.code)
    }

    pub fn region(&self, source_id: u32) -> Option<&Region> {
        self.by_source_id.get(&source_id).map(|&idx| &self.regions[idx])
    }

    /// Commodity slug for a portal display name (surrounding whitespace ignored).
    pub fn commodity_slug(&self, name: &str) -> Option<&'static str> {
        self.slugs.get(name.trim()).copied()
    }

    /// All regions in portal-id order.
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Look a region up by canonical code or display name (case-insensitive).
    ///
    /// Portal ids are not accepted: they overlap the canonical code range.
    pub fn find_region(&self, query: &str) -> Option<&Region> {
        let query = query.trim();
        self.regions
            .iter()
            .find(|r| r.code == query || r.name.eq_ignore_ascii_case(query))
    }
}

impl Default for CodeTables {
    fn default() -> Self {
        Self::standard()
    }
}

/// Display name for a category code, for logs.
pub fn category_name(code: u8) -> &'static str {
    CATEGORIES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
        .unwrap_or("unknown")
}
