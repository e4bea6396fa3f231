//! Defect sites and the queries shared by every kind of defect collection.

use nalgebra::Vector3;

use crate::{
    cavity::CavityOutcome,
    config::DefectConfig,
    coordination::{shell_of, CoordinationShell},
    element::ElementTable,
    error::{DefectError, Result},
    species::SpeciesOccupancy,
    structure::Structure,
};

#[derive(Debug, Clone, PartialEq)]
pub enum DefectKind {
    /// Removal of structure site `site_index`, which holds `occupancy`.
    Vacancy {
        site_index: usize,
        occupancy: SpeciesOccupancy,
    },
    Interstitial,
}

/// A symmetry-distinct defect position.
#[derive(Debug, Clone, PartialEq)]
pub struct DefectSite {
    /// Position in the collection's ordered list of representatives.
    pub index: usize,
    pub frac: Vector3<f64>,
    pub cart: Vector3<f64>,
    pub kind: DefectKind,
    /// Number of candidate positions in this site's orbit.
    pub multiplicity: usize,
}

impl DefectSite {
    /// The structure site the defect sits on, if any.
    pub fn site_index(&self) -> Option<usize> {
        match self.kind {
            DefectKind::Vacancy { site_index, .. } => Some(site_index),
            DefectKind::Interstitial => None,
        }
    }
}

/// A collection of symmetry-distinct defect sites in a structure, with per-site analysis.
///
/// Every index-taking method fails with [`DefectError::InvalidIndex`] outside
/// `0..defectsite_count()`.
pub trait PointDefects {
    fn structure(&self) -> &Structure;

    fn config(&self) -> &DefectConfig;

    fn element_table(&self) -> &dyn ElementTable;

    /// Representatives in generation order.
    fn enumerate_defectsites(&self) -> &[DefectSite];

    /// Number of candidate positions before symmetry reduction.
    fn candidate_count(&self) -> usize;

    /// Charge the defect carries relative to the perfect crystal, if defined.
    fn effective_charge(&self, i: usize) -> Result<Option<f64>>;

    fn cavity(&self, i: usize) -> Result<CavityOutcome>;

    fn defectsite_count(&self) -> usize {
        self.enumerate_defectsites().len()
    }

    fn defectsite(&self, i: usize) -> Result<&DefectSite> {
        let sites = self.enumerate_defectsites();
        sites.get(i).ok_or(DefectError::InvalidIndex {
            index: i,
            count: sites.len(),
        })
    }

    fn multiplicity(&self, i: usize) -> Result<usize> {
        Ok(self.defectsite(i)?.multiplicity)
    }

    fn coordination_shell(&self, i: usize) -> Result<CoordinationShell> {
        let site = self.defectsite(i)?;
        Ok(shell_of(
            &site.frac,
            site.site_index(),
            self.structure(),
            self.element_table(),
            &self.config().coordination,
        )?)
    }

    fn coordination_number(&self, i: usize) -> Result<f64> {
        Ok(self.coordination_shell(i)?.coordination_number())
    }

    fn coordinated_elements(&self, i: usize) -> Result<Vec<String>> {
        Ok(self.coordination_shell(i)?.coordinated_elements())
    }

    fn coordinated_sites(&self, i: usize) -> Result<Vec<usize>> {
        Ok(self.coordination_shell(i)?.coordinated_sites())
    }

    fn coordsites_charge_sum(&self, i: usize) -> Result<f64> {
        Ok(self.coordination_shell(i)?.charge_sum())
    }

    /// `None` when the shell is empty.
    fn coordsites_min_max_charge(&self, i: usize) -> Result<Option<(f64, f64)>> {
        Ok(self.coordination_shell(i)?.min_max_charge())
    }
}
