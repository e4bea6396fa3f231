//! Per-site analysis of a whole defect collection, and a plain-text table of the results.

use std::fmt::Display;

use rayon::prelude::*;
use tabled::{Table, Tabled};

use crate::{
    cavity::{CavityDescriptor, CavityOutcome},
    defect::{DefectKind, PointDefects},
    error::Result,
};

/// Everything computed for one defect site.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteDescriptor {
    pub index: usize,
    pub kind: DefectKind,
    pub frac: [f64; 3],
    pub multiplicity: usize,
    pub coordination_number: f64,
    pub coordinated_elements: Vec<String>,
    pub coordinated_sites: Vec<usize>,
    pub charge_sum: f64,
    pub min_max_charge: Option<(f64, f64)>,
    pub effective_charge: Option<f64>,
    pub cavity: CavityOutcome,
}

fn describe<D: PointDefects + ?Sized>(defects: &D, i: usize) -> Result<SiteDescriptor> {
    let site = defects.defectsite(i)?;
    let shell = defects.coordination_shell(i)?;
    Ok(SiteDescriptor {
        index: i,
        kind: site.kind.clone(),
        frac: [site.frac.x, site.frac.y, site.frac.z],
        multiplicity: site.multiplicity,
        coordination_number: shell.coordination_number(),
        coordinated_elements: shell.coordinated_elements(),
        coordinated_sites: shell.coordinated_sites(),
        charge_sum: shell.charge_sum(),
        min_max_charge: shell.min_max_charge(),
        effective_charge: defects.effective_charge(i)?,
        cavity: defects.cavity(i)?,
    })
}

/// Describes every site of the collection in parallel. Results are in site order; the first
/// failing site's error is returned.
pub fn analyze_all<D: PointDefects + Sync + ?Sized>(defects: &D) -> Result<Vec<SiteDescriptor>> {
    (0..defects.defectsite_count())
        .into_par_iter()
        .map(|i| describe(defects, i))
        .collect()
}

#[derive(Debug, Clone, Tabled)]
struct SummaryRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Position")]
    position: String,
    #[tabled(rename = "Mult.")]
    multiplicity: usize,
    #[tabled(rename = "CN")]
    coordination: String,
    #[tabled(rename = "Neighbors")]
    neighbors: String,
    #[tabled(rename = "Charge")]
    charge: String,
    #[tabled(rename = "Cavity")]
    cavity: String,
}

fn or_dash<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_owned(), |v| v.to_string())
}

impl From<&SiteDescriptor> for SummaryRow {
    fn from(d: &SiteDescriptor) -> Self {
        let kind = match &d.kind {
            DefectKind::Vacancy { occupancy, .. } => format!("V({occupancy})"),
            DefectKind::Interstitial => "Int".to_owned(),
        };
        let mut cavity = match d.cavity.descriptor {
            CavityDescriptor::Polyhedron {
                volume,
                surface_area,
            } => format!("{volume:.3} Å³ / {surface_area:.3} Å²"),
            CavityDescriptor::EmptySphere { radius } => format!("r = {radius:.3} Å"),
        };
        if d.cavity.degenerate {
            cavity.push_str(" (degenerate)");
        }
        Self {
            index: d.index,
            kind,
            position: format!("({:.4}, {:.4}, {:.4})", d.frac[0], d.frac[1], d.frac[2]),
            multiplicity: d.multiplicity,
            coordination: format!("{:.2}", d.coordination_number),
            neighbors: d.coordinated_elements.join(" "),
            charge: or_dash(d.effective_charge.map(|q| format!("{q:+.2}"))),
            cavity,
        }
    }
}

/// Renders descriptors as a text table, one row per site.
pub fn summary_table(descriptors: &[SiteDescriptor]) -> String {
    Table::new(descriptors.iter().map(SummaryRow::from)).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::DefectConfig, interstitial::Interstitial, structure::tests::mgo, vacancy::Vacancy,
    };
    use pretty_assertions::assert_eq;

    #[test]
    fn test_analyze_vacancies() {
        let s = mgo();
        let v = Vacancy::new(&s, DefectConfig::new(1e-3)).unwrap();
        let all = analyze_all(&v).unwrap();
        assert_eq!(all.len(), 2);
        for (i, d) in all.iter().enumerate() {
            assert_eq!(d.index, i);
            assert_eq!(d.coordination_number, v.coordination_number(i).unwrap());
            assert_eq!(d.cavity, v.cavity(i).unwrap());
            assert_eq!(d.effective_charge, v.effective_charge(i).unwrap());
        }
        assert_eq!(all[0].coordinated_elements, vec!["O".to_owned()]);
    }

    #[test]
    fn test_summary_table() {
        let s = mgo();
        let inter = Interstitial::new(&s, DefectConfig::new(1e-3)).unwrap();
        let table = summary_table(&analyze_all(&inter).unwrap());
        assert!(table.contains("Mult."));
        assert!(table.contains("Int"));
        assert!(table.contains("r = "));
        // header, separators and two rows
        assert!(table.lines().count() >= 4);
    }
}
