//! IMEX Catalog - Single Source of Truth for product codes
//!
//! Each item is an (internal code, IMEX code, display label) triple. The
//! catalog is explicitly owned and injected; there is no ambient singleton.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogItem {
    /// Internal identifier (e.g. `ASTM_A216_WCB`).
    pub code: String,
    /// What goes into the IMEX description (e.g. `WCB`).
    pub imex_code: String,
    /// User-friendly display text.
    pub label: String,
}

impl CatalogItem {
    fn new(code: &str, imex_code: &str, label: &str) -> Self {
        Self {
            code: code.to_string(),
            imex_code: imex_code.to_string(),
            label: label.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CatalogCategory {
    ValveModels,
    EndConnections,
    BodyMaterials,
    TrimMaterials,
    SeatMaterials,
    StemMaterials,
    ActuationCodes,
    Suffixes,
    PressureClasses,
    DiameterOptions,
    ConstructionStandards,
    FlangeFaces,
}

impl CatalogCategory {
    pub const ALL: [CatalogCategory; 12] = [
        CatalogCategory::ValveModels,
        CatalogCategory::EndConnections,
        CatalogCategory::BodyMaterials,
        CatalogCategory::TrimMaterials,
        CatalogCategory::SeatMaterials,
        CatalogCategory::StemMaterials,
        CatalogCategory::ActuationCodes,
        CatalogCategory::Suffixes,
        CatalogCategory::PressureClasses,
        CatalogCategory::DiameterOptions,
        CatalogCategory::ConstructionStandards,
        CatalogCategory::FlangeFaces,
    ];

    pub fn file_stem(&self) -> &'static str {
        match self {
            CatalogCategory::ValveModels => "valve_models",
            CatalogCategory::EndConnections => "end_connections",
            CatalogCategory::BodyMaterials => "body_materials",
            CatalogCategory::TrimMaterials => "trim_materials",
            CatalogCategory::SeatMaterials => "seat_materials",
            CatalogCategory::StemMaterials => "stem_materials",
            CatalogCategory::ActuationCodes => "actuation_codes",
            CatalogCategory::Suffixes => "suffixes",
            CatalogCategory::PressureClasses => "pressure_classes",
            CatalogCategory::DiameterOptions => "diameter_options",
            CatalogCategory::ConstructionStandards => "construction_standards",
            CatalogCategory::FlangeFaces => "flange_faces",
        }
    }

    pub fn from_file_stem(stem: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.file_stem() == stem)
    }
}

/// Catalog registry - loads, caches and serves reference items per category.
#[derive(Debug, Clone)]
pub struct Catalog {
    sections: HashMap<CatalogCategory, Vec<CatalogItem>>,
}

impl Catalog {
    pub fn empty() -> Self {
        Self {
            sections: HashMap::new(),
        }
    }

    /// Production seed data. Overridable per category via
    /// [`Catalog::load_from_dir`] or [`Catalog::register`].
    pub fn builtin() -> Self {
        let mut catalog = Self::empty();

        catalog.replace(
            CatalogCategory::ValveModels,
            vec![
                CatalogItem::new("ESFERA", "TRUF", "Esfera - Trunnion Full Bore"),
                CatalogItem::new("ESFERA_RED", "TRUR", "Esfera - Trunnion Reduced Bore"),
                CatalogItem::new("ESFERA_FLOAT", "FL3F", "Esfera - Floating 3-Piece"),
                CatalogItem::new("GAVETA", "GVSC", "Gaveta - Gate Valve Slab"),
                CatalogItem::new("GAVETA_EXP", "GVEX", "Gaveta - Expanding Gate"),
                CatalogItem::new("GLOBO", "GLBY", "Globo - Globe Y-Pattern"),
                CatalogItem::new("GLOBO_ANG", "GLBA", "Globo - Globe Angle"),
                CatalogItem::new("RETENCAO", "CHKS", "Retencao - Check Swing"),
                CatalogItem::new("RETENCAO_PIST", "CHKP", "Retencao - Check Piston"),
                CatalogItem::new("BORBOLETA", "BTFL", "Borboleta - Butterfly"),
                CatalogItem::new("CONTROLE", "CTRL", "Controle - Control Valve"),
            ],
        );

        catalog.replace(
            CatalogCategory::EndConnections,
            vec![
                CatalogItem::new("FLANGEADO", "FRE", "Flangeado - RF/RTJ Ends"),
                CatalogItem::new("FLANGEADO_RF", "FRF", "Flangeado - Raised Face"),
                CatalogItem::new("FLANGEADO_RTJ", "RTJ", "Flangeado - Ring Type Joint"),
                CatalogItem::new("FLANGEADO_FF", "FFF", "Flangeado - Flat Face"),
                CatalogItem::new("BW", "BWE", "BW - Butt Weld Ends"),
                CatalogItem::new("SW", "SOW", "SW - Socket Weld"),
                CatalogItem::new("NPT", "NIP", "NPT - Rosqueado (Threaded)"),
                CatalogItem::new("WAFER", "WAF", "Wafer"),
                CatalogItem::new("LUG", "LUG", "Lug"),
            ],
        );

        catalog.replace(
            CatalogCategory::BodyMaterials,
            vec![
                CatalogItem::new("ASTM_A216_WCB", "WCB", "ASTM A216 WCB - Aco Carbono"),
                CatalogItem::new("ASTM_A352_LCB", "LCB", "ASTM A352 LCB - Baixa Temperatura"),
                CatalogItem::new("ASTM_A352_LCC", "LCC", "ASTM A352 LCC - Baixa Temperatura"),
                CatalogItem::new("ASTM_A351_CF8M", "36L", "ASTM A351 CF8M - Inox 316"),
                CatalogItem::new("ASTM_A351_CF3M", "36L", "ASTM A351 CF3M - Inox 316L"),
                CatalogItem::new("ASTM_A995_4A", "F55", "ASTM A995 4A - Duplex"),
                CatalogItem::new("ASTM_A995_5A", "F55", "ASTM A995 5A - Super Duplex"),
                CatalogItem::new("ASTM_A995_6A", "F55", "ASTM A995 6A - Super Duplex"),
                CatalogItem::new("ASTM_A105", "A15", "ASTM A105 - Aco Carbono Forjado"),
                CatalogItem::new("ASTM_A182_F316", "36L", "ASTM A182 F316 - Inox 316 Forjado"),
                CatalogItem::new("ASTM_A182_F304", "34L", "ASTM A182 F304 - Inox 304 Forjado"),
                CatalogItem::new("ASTM_A890_4A", "F55", "ASTM A890 4A - Duplex"),
                CatalogItem::new("INCONEL_625", "I25", "Inconel 625"),
                CatalogItem::new("MONEL_400", "M40", "Monel 400"),
            ],
        );

        catalog.replace(
            CatalogCategory::TrimMaterials,
            vec![
                CatalogItem::new("PTFE_PTFE", "D2D2PE", "PTFE / PTFE"),
                CatalogItem::new("RPTFE_RPTFE", "D2D2RP", "RPTFE / RPTFE"),
                CatalogItem::new("PEEK_PEEK", "A2A2PK", "PEEK / PEEK"),
                CatalogItem::new("METAL_METAL", "M1STST", "Metal-Metal (Stellite)"),
                CatalogItem::new("ENP_ENP", "A2A2RC", "ENP / ENP - Nickel Plating"),
                CatalogItem::new("INCONEL_INCONEL", "M1ININ", "Inconel / Inconel"),
                CatalogItem::new("STELLITE_STELLITE", "M1STST", "Stellite / Stellite"),
                CatalogItem::new("NYLON_NYLON", "D2D2NY", "Nylon / Nylon"),
                CatalogItem::new("DEVLON_DEVLON", "D2D2DV", "Devlon / Devlon"),
                CatalogItem::new("GRAFITE_GRAFITE", "A2A2GR", "Grafite / Grafite"),
            ],
        );

        catalog.replace(
            CatalogCategory::SeatMaterials,
            vec![
                CatalogItem::new("PTFE", "PT", "PTFE"),
                CatalogItem::new("RPTFE", "RP", "RPTFE (Reforcado)"),
                CatalogItem::new("PEEK", "PK", "PEEK"),
                CatalogItem::new("METAL", "MT", "Metal-Metal"),
                CatalogItem::new("STELLITE", "ST", "Stellite"),
                CatalogItem::new("ENP", "EP", "ENP (Nickel Plating)"),
                CatalogItem::new("INCONEL", "IN", "Inconel"),
                CatalogItem::new("NYLON", "NY", "Nylon"),
                CatalogItem::new("DEVLON", "DV", "Devlon"),
                CatalogItem::new("GRAFITE", "GR", "Grafite"),
            ],
        );

        catalog.replace(
            CatalogCategory::StemMaterials,
            vec![
                CatalogItem::new("ASTM_A182_F6A", "F6A", "ASTM A182 F6a - Inox 410"),
                CatalogItem::new("ASTM_A182_F316", "316", "ASTM A182 F316 - Inox 316"),
                CatalogItem::new("ASTM_A182_F51", "F51", "ASTM A182 F51 - Duplex"),
                CatalogItem::new("ASTM_A182_F53", "F53", "ASTM A182 F53 - Super Duplex"),
                CatalogItem::new("INCONEL_625", "I25", "Inconel 625"),
                CatalogItem::new("MONEL_K500", "K50", "Monel K500"),
            ],
        );

        catalog.replace(
            CatalogCategory::ActuationCodes,
            vec![
                CatalogItem::new("MANUAL", "0L0000", "Manual - Sem atuador"),
                CatalogItem::new("MANUAL_GEAR", "0L538M", "Manual - Com redutor (Gearbox)"),
                CatalogItem::new("PNEUMATICO_SA", "1V4GB7", "Pneumatico - Single Acting"),
                CatalogItem::new("PNEUMATICO_DA", "1V4GBD", "Pneumatico - Double Acting"),
                CatalogItem::new("PNEUMATICO", "1V4GB7", "Pneumatico"),
                CatalogItem::new("ELETRICO", "0L6GL7", "Eletrico"),
                CatalogItem::new("HIDRAULICO", "0L7HY1", "Hidraulico"),
                CatalogItem::new("ELETRO_HIDRAULICO", "0L8EH1", "Eletro-Hidraulico"),
            ],
        );

        catalog.replace(
            CatalogCategory::Suffixes,
            vec![
                CatalogItem::new("NEW", "NEW", "Novo - Padrao"),
                CatalogItem::new("FS", "FS", "Fire Safe (Testada a Fogo)"),
                CatalogItem::new("LFE", "LFE", "Low Fugitive Emission"),
                CatalogItem::new("NACE", "NACE", "NACE MR0175 / ISO 15156"),
                CatalogItem::new("SIL1", "SIL1", "SIL 1 Certified"),
                CatalogItem::new("SIL2", "SIL2", "SIL 2 Certified"),
                CatalogItem::new("SIL3", "SIL3", "SIL 3 Certified"),
                CatalogItem::new("CRY", "CRY", "Cryogenic Service"),
                CatalogItem::new("HT", "HT", "High Temperature"),
            ],
        );

        catalog.replace(
            CatalogCategory::PressureClasses,
            vec![
                CatalogItem::new("150", "1", "Class 150"),
                CatalogItem::new("300", "3", "Class 300"),
                CatalogItem::new("600", "6", "Class 600"),
                CatalogItem::new("800", "8", "Class 800"),
                CatalogItem::new("900", "A", "Class 900"),
                CatalogItem::new("1500", "B", "Class 1500"),
                CatalogItem::new("2500", "Y", "Class 2500"),
            ],
        );

        catalog.replace(
            CatalogCategory::DiameterOptions,
            vec![
                CatalogItem::new("0.5", "005", "1/2\""),
                CatalogItem::new("0.75", "008", "3/4\""),
                CatalogItem::new("1", "010", "1\""),
                CatalogItem::new("1.5", "015", "1 1/2\""),
                CatalogItem::new("2", "020", "2\""),
                CatalogItem::new("3", "030", "3\""),
                CatalogItem::new("4", "040", "4\""),
                CatalogItem::new("6", "060", "6\""),
                CatalogItem::new("8", "080", "8\""),
                CatalogItem::new("10", "100", "10\""),
                CatalogItem::new("12", "120", "12\""),
                CatalogItem::new("14", "140", "14\""),
                CatalogItem::new("16", "160", "16\""),
                CatalogItem::new("18", "180", "18\""),
                CatalogItem::new("20", "200", "20\""),
                CatalogItem::new("24", "240", "24\""),
                CatalogItem::new("30", "300", "30\""),
                CatalogItem::new("36", "360", "36\""),
            ],
        );

        catalog.replace(
            CatalogCategory::ConstructionStandards,
            vec![
                CatalogItem::new("ABNT_NBR_15827", "NBR", "ABNT NBR 15827 - Valvulas para petroleo e gas"),
                CatalogItem::new("API_6D", "6D", "API 6D - Pipeline valves"),
                CatalogItem::new("ISO_14313", "ISO", "ISO 14313 - Pipeline valves"),
                CatalogItem::new("API_6A", "6A", "API 6A - Wellhead equipment"),
                CatalogItem::new("API_600", "600", "API 600 - Steel gate valves"),
                CatalogItem::new("API_602", "602", "API 602 - Compact steel gate valves"),
            ],
        );

        catalog.replace(
            CatalogCategory::FlangeFaces,
            vec![
                CatalogItem::new("RF", "RF", "RF - Raised Face"),
                CatalogItem::new("RTJ", "RJ", "RTJ - Ring Type Joint"),
                CatalogItem::new("FF", "FF", "FF - Flat Face"),
            ],
        );

        catalog
    }

    /// Load category files (`<category>.json`, each a `Vec<CatalogItem>`)
    /// on top of the built-in seed. Unknown file stems are skipped.
    pub fn load_from_dir(dir: &Path) -> Result<Self, std::io::Error> {
        let mut catalog = Self::builtin();
        if dir.exists() {
            for entry in fs::read_dir(dir)? {
                let entry = entry?;
                let path = entry.path();
                if path.extension().map_or(false, |e| e == "json") {
                    let stem = match path.file_stem().and_then(|s| s.to_str()) {
                        Some(s) => s.to_string(),
                        None => continue,
                    };
                    let category = match CatalogCategory::from_file_stem(&stem) {
                        Some(c) => c,
                        None => continue,
                    };
                    if let Ok(content) = fs::read_to_string(&path) {
                        if let Ok(items) = serde_json::from_str::<Vec<CatalogItem>>(&content) {
                            catalog.replace(category, items);
                        }
                    }
                }
            }
        }
        Ok(catalog)
    }

    pub fn replace(&mut self, category: CatalogCategory, items: Vec<CatalogItem>) {
        self.sections.insert(category, items);
    }

    pub fn register(&mut self, category: CatalogCategory, item: CatalogItem) {
        self.sections.entry(category).or_default().push(item);
    }

    pub fn items(&self, category: CatalogCategory) -> &[CatalogItem] {
        self.sections.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn find_by_code(&self, category: CatalogCategory, code: &str) -> Option<&CatalogItem> {
        self.items(category).iter().find(|i| i.code == code)
    }

    pub fn find_by_imex_code(
        &self,
        category: CatalogCategory,
        imex_code: &str,
    ) -> Option<&CatalogItem> {
        self.items(category).iter().find(|i| i.imex_code == imex_code)
    }

    pub fn imex_code(&self, category: CatalogCategory, code: &str) -> Option<&str> {
        self.find_by_code(category, code).map(|i| i.imex_code.as_str())
    }

    /// Display label for a code; falls back to the code itself.
    pub fn label<'a>(&'a self, category: CatalogCategory, code: &'a str) -> &'a str {
        self.find_by_code(category, code)
            .map(|i| i.label.as_str())
            .unwrap_or(code)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_lookups() {
        let catalog = Catalog::builtin();
        assert_eq!(
            catalog.imex_code(CatalogCategory::ValveModels, "ESFERA"),
            Some("TRUF")
        );
        assert_eq!(
            catalog.imex_code(CatalogCategory::EndConnections, "FLANGEADO_RF"),
            Some("FRF")
        );
        assert_eq!(
            catalog.imex_code(CatalogCategory::PressureClasses, "800"),
            Some("8")
        );
        assert!(catalog
            .find_by_imex_code(CatalogCategory::BodyMaterials, "WCB")
            .is_some());
    }

    #[test]
    fn unknown_code_is_none() {
        let catalog = Catalog::builtin();
        assert!(catalog.find_by_code(CatalogCategory::ValveModels, "AGULHA").is_none());
        assert_eq!(catalog.label(CatalogCategory::ValveModels, "AGULHA"), "AGULHA");
    }
}
