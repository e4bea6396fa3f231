//! Symmetry-distinct interstitial positions, taken from the vertices of the power tessellation.

use log::debug;

use crate::{
    cavity::CavityOutcome,
    config::DefectConfig,
    defect::{DefectKind, DefectSite, PointDefects},
    element::{ElementTable, PERIODIC_TABLE},
    error::Result,
    orbit::OrbitPartition,
    species::Species,
    structure::Structure,
    symmetry::{SymmetryFinder, SymmetryOracle, SymmetryService},
    voronoi::interstitial_candidates,
};

#[derive(Debug, Clone)]
pub struct Interstitial<'a> {
    structure: &'a Structure,
    table: &'a dyn ElementTable,
    config: DefectConfig,
    sites: Vec<DefectSite>,
    candidate_count: usize,
}

impl<'a> Interstitial<'a> {
    /// Interstitials found with the built-in symmetry search and periodic table.
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
        if let Some(sp) = &config.inserted_species {
            table.species_charge(sp)?;
        }
        let oracle = SymmetryOracle::new(
            symmetry,
            structure,
            config.symmetry_tolerance,
            config.position_tolerance,
        )?;

        let candidates = interstitial_candidates(structure, table, config.position_tolerance)?;
        let partition = OrbitPartition::from_candidates(candidates, &oracle);
        debug!(
            "{}: {} interstitial candidates in {} orbits",
            structure.formula(),
            partition.candidate_count(),
            partition.len()
        );

        let candidate_count = partition.candidate_count();
        let sizes = partition.orbit_sizes();
        let sites = partition
            .into_representatives()
            .into_iter()
            .zip(sizes)
            .enumerate()
            .map(|(index, (frac, multiplicity))| DefectSite {
                index,
                frac,
                cart: structure.lattice().to_cartesian(&frac),
                kind: DefectKind::Interstitial,
                multiplicity,
            })
            .collect();

        Ok(Self {
            structure,
            table,
            config,
            sites,
            candidate_count,
        })
    }

    /// Radius of the empty sphere at interstitial `i`, in angstroms.
    pub fn radius(&self, i: usize) -> Result<f64> {
        Ok(self.cavity(i)?.descriptor.radius())
    }

    /// The species placed at the interstitial sites, if one was configured.
    pub fn inserted_species(&self) -> Option<&Species> {
        self.config.inserted_species.as_ref()
    }
}

impl PointDefects for Interstitial<'_> {
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

    /// The charge of the inserted species, or `None` if no species was configured.
    fn effective_charge(&self, i: usize) -> Result<Option<f64>> {
        self.defectsite(i)?;
        match self.inserted_species() {
            Some(sp) => Ok(Some(f64::from(self.table.species_charge(sp)?))),
            None => Ok(None),
        }
    }

    fn cavity(&self, i: usize) -> Result<CavityOutcome> {
        let site = self.defectsite(i)?;
        Ok(self
            .config
            .cavity_engine
            .interstitial_cavity(self.structure, &site.frac, self.table)?)
    }
}
