pub mod company;
pub mod composition;
pub mod hazard;
pub mod regulatory;

use crate::db::{CompositionRow, HazardRow, ProductRow, RegulatoryRow, SectionRow};
use crate::segmenter::Segmentation;

/// Everything extracted from one document, ready for storage.
pub struct ExtractedData {
    pub sections: Vec<SectionRow>,
    pub product: Option<ProductRow>,
    pub hazard: Option<HazardRow>,
    pub composition: Vec<CompositionRow>,
    pub regulatory: Vec<RegulatoryRow>,
}

/// Run the per-section field parsers over a segmentation result.
pub fn extract_all(doc_name: &str, seg: &Segmentation) -> ExtractedData {
    let sections = seg
        .trace
        .iter()
        .map(|t| SectionRow {
            doc_name: doc_name.to_string(),
            section_key: t.key.clone(),
            strategy: t.strategy.as_str().to_string(),
            body: seg.sections.get(&t.key).cloned().unwrap_or_default(),
        })
        .collect();

    let product = seg
        .sections
        .get("chemical_product_company")
        .filter(|b| !b.is_empty())
        .map(|b| company::extract(doc_name, b));
    let hazard = seg
        .sections
        .get("hazards")
        .filter(|b| !b.is_empty())
        .map(|b| hazard::extract(doc_name, b));
    let composition = seg
        .sections
        .get("composition")
        .map(|b| composition::extract(doc_name, b))
        .unwrap_or_default();
    let regulatory = seg
        .sections
        .get("regulatory")
        .map(|b| regulatory::extract(doc_name, b))
        .unwrap_or_default();

    ExtractedData {
        sections,
        product,
        hazard,
        composition,
        regulatory,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmenter::{catalog::Catalog, segment, SegmenterConfig};

    #[test]
    fn fixture_extraction_end_to_end() {
        let fixture = std::fs::read_to_string("tests/fixtures/acetone_kr.txt").unwrap();
        let pages: Vec<String> = fixture.split('\u{0c}').map(String::from).collect();
        let seg = segment(&pages, &Catalog::builtin(), &SegmenterConfig::default());
        let data = extract_all("acetone", &seg);

        assert_eq!(data.sections.len(), seg.sections.len());

        let product = data.product.unwrap();
        assert_eq!(product.product_name.as_deref(), Some("아세톤"));
        assert_eq!(product.company_name.as_deref(), Some("한국케미칼"));

        let hazard = data.hazard.unwrap();
        assert_eq!(hazard.signal_word.as_deref(), Some("위험"));
        assert!(hazard.h_codes.contains("H225"));
        assert!(hazard.pictograms.contains("GHS02"));

        assert_eq!(data.composition.len(), 1);
        assert_eq!(data.composition[0].cas, "67-64-1");

        assert!(data
            .regulatory
            .iter()
            .any(|r| r.canonical_name == "유독물질"));
    }
}
