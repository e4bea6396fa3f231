//! Symmetry-distinct vacancies: every structure site is a candidate, and sites related by a
//! symmetry operation with identical occupancy collapse into one representative.

use log::debug;

use crate::{
    cavity::CavityOutcome,
    config::DefectConfig,
    defect::{DefectKind, DefectSite, PointDefects},
    element::{ElementTable, PERIODIC_TABLE},
    error::{DefectError, Result},
    orbit::OrbitPartition,
    structure::Structure,
    symmetry::{SymmetryFinder, SymmetryOracle, SymmetryService},
};

#[derive(Debug, Clone)]
pub struct Vacancy<'a> {
    structure: &'a Structure,
    table: &'a dyn ElementTable,
    config: DefectConfig,
    sites: Vec<DefectSite>,
    /// Structure index of each representative, parallel to `sites`.
    site_indices: Vec<usize>,
    candidate_count: usize,
}

/// Site indices grouped by occupancy. Groups are in order of first appearance, sites in structure
/// order within a group.
fn candidates_by_occupancy(structure: &Structure) -> Vec<usize> {
    let sites = structure.sites();
    let mut groups: Vec<Vec<usize>> = vec![];
    for (i, site) in sites.iter().enumerate() {
        match groups
            .iter_mut()
            .find(|g| sites[g[0]].occupancy.matches(&site.occupancy))
        {
            Some(g) => g.push(i),
            None => groups.push(vec![i]),
        }
    }
    groups.into_iter().flatten().collect()
}

impl<'a> Vacancy<'a> {
    /// Vacancies found with the built-in symmetry search and periodic table.
    pub fn new(structure: &'a Structure, config: DefectConfig) -> Result<Self> {
        Self::with_services(structure, config, &SymmetryFinder, &PERIODIC_TABLE)
    }

    pub fn with_services<S: SymmetryService + ?Sized>(
        structure: &'a Structure,
        config: DefectConfig,
        symmetry: &S,
        table: &'a dyn ElementTable,
    ) -> Result<Self> {
        config.validate()?;
        for site in structure.sites() {
            table.site_charge(&site.occupancy)?;
        }
        let oracle = SymmetryOracle::new(
            symmetry,
            structure,
            config.symmetry_tolerance,
            config.position_tolerance,
        )?;

        let sites = structure.sites();
        let equivalent = |a: &usize, b: &usize| {
            sites[*a].occupancy.matches(&sites[*b].occupancy)
                && oracle.are_equivalent(&sites[*a].frac, &sites[*b].frac)
        };
        let candidates = candidates_by_occupancy(structure);
        let partition = OrbitPartition::from_candidates(candidates, &equivalent);
        debug!(
            "{}: {} vacancy candidates in {} orbits",
            structure.formula(),
            partition.candidate_count(),
            partition.len()
        );

        let site_indices = partition.representatives().to_vec();
        let defect_sites = site_indices
            .iter()
            .zip(partition.orbit_sizes())
            .enumerate()
            .map(|(index, (&site_index, multiplicity))| {
                let site = &sites[site_index];
                // the shell search wraps its center, so the cavity center must be wrapped too
                let frac = structure.lattice().wrap(&site.frac);
                DefectSite {
                    index,
                    frac,
                    cart: structure.lattice().to_cartesian(&frac),
                    kind: DefectKind::Vacancy {
                        site_index,
                        occupancy: site.occupancy.clone(),
                    },
                    multiplicity,
                }
            })
            .collect();

        Ok(Self {
            structure,
            table,
            config,
            sites: defect_sites,
            site_indices,
            candidate_count: partition.candidate_count(),
        })
    }

    /// The structure index of the site removed by vacancy `i`.
    pub fn defectsite_index(&self, i: usize) -> Result<usize> {
        self.site_indices
            .get(i)
            .copied()
            .ok_or(DefectError::InvalidIndex {
                index: i,
                count: self.site_indices.len(),
            })
    }

    /// Volume of the cavity left by vacancy `i`, in cubic angstroms.
    pub fn volume(&self, i: usize) -> Result<f64> {
        Ok(self.cavity(i)?.descriptor.volume())
    }

    /// Surface area of the cavity left by vacancy `i`, in square angstroms.
    pub fn surface_area(&self, i: usize) -> Result<f64> {
        Ok(self.cavity(i)?.descriptor.surface_area())
    }
}

impl PointDefects for Vacancy<'_> {
    fn structure(&self) -> &Structure {
        self.structure
    }

    fn config(&self) -> &DefectConfig {
        &self.config
    }

    fn element_table(&self) -> &dyn ElementTable {
        self.table
    }

    fn enumerate_defectsites(&self) -> &[DefectSite] {
        &self.sites
    }

    fn candidate_count(&self) -> usize {
        self.candidate_count
    }

    /// Minus the charge of the removed site.
    fn effective_charge(&self, i: usize) -> Result<Option<f64>> {
        let site = self.defectsite(i)?;
        match &site.kind {
            DefectKind::Vacancy { occupancy, .. } => Ok(Some(-self.table.site_charge(occupancy)?)),
            DefectKind::Interstitial => Ok(None),
        }
    }

    fn cavity(&self, i: usize) -> Result<CavityOutcome> {
        let shell = self.coordination_shell(i)?;
        let site = self.defectsite(i)?;
        Ok(self.config.cavity_engine.vacancy_cavity(&site.cart, &shell))
    }
}
