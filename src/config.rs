//! Mechanism for loading and sharing the analysis configuration

use crate::{
    clustering::{JetAlgorithm, JetDefinition},
    event::status,
    evgen,
    numeric::Float,
};

use eyre::{ensure, eyre, Result, WrapErr};
use log::info;
use particle_id::ParticleID;

use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Environment variable holding the path to the configuration file
pub const CONFIG_ENV_VAR: &str = "HIGGS_TRACER_CONFIG";

/// Analysis configuration
#[derive(Clone, Debug, PartialEq)]
pub struct Configuration {
    /// Number of events to be simulated
    pub num_events: usize,

    /// Seed of the random number generator
    pub seed: u64,

    /// Collision energy at center of mass (GeV)
    pub e_cm: Float,

    /// Higgs boson mass (GeV)
    pub higgs_mass: Float,

    /// Probability that the generation of an event fails
    pub failure_rate: Float,

    /// Relative weight of gluon fusion
    pub frac_ggf: Float,

    /// Relative weight of vector boson fusion
    pub frac_vbf: Float,

    /// Relative weight of associated production with a vector boson
    pub frac_vh: Float,

    /// Relative weight of associated production with a top pair
    pub frac_tth: Float,

    /// Species that are analyzed as Higgs bosons
    pub higgs_ids: Vec<ParticleID>,

    /// Statuses of the Higgs bosons that are analyzed
    pub decayed_statuses: Vec<i32>,

    /// Minimal number of decay products for a Higgs to be recorded
    pub min_decay_products: usize,

    /// Whether the invariant masses of all decay product subsets are computed
    pub subset_masses: bool,

    /// Whether jets are clustered and matched to decay products
    pub clustering: bool,

    /// Jet clustering parameters
    pub jet_definition: JetDefinition,

    /// Minimal jet transverse momentum for the jet multiplicity (GeV)
    pub jet_multiplicity_pt: Float,

    /// Les Houches event file providing the production channels, if any
    pub lhe_file: Option<PathBuf>,

    /// File receiving the kinematics of selected particles, if any
    pub particle_dump: Option<PathBuf>,

    /// Species of the dumped particles, `None` meaning every particle
    pub particle_dump_ids: Option<Vec<ParticleID>>,
}
//
impl Default for Configuration {
    fn default() -> Self {
        Self {
            num_events: 10_000,
            seed: 42,
            e_cm: 13_000.,
            higgs_mass: 125.,
            failure_rate: 0.,
            frac_ggf: 0.87,
            frac_vbf: 0.068,
            frac_vh: 0.04,
            frac_tth: 0.022,
            higgs_ids: vec![ParticleID::new(25)],
            decayed_statuses: vec![status::DECAYED_RESONANCE],
            min_decay_products: 2,
            subset_masses: true,
            clustering: true,
            jet_definition: JetDefinition {
                algorithm: JetAlgorithm::AntiKt,
                radius: 0.4,
                min_pt: 0.,
            },
            jet_multiplicity_pt: 30.,
            lhe_file: None,
            particle_dump: None,
            particle_dump_ids: Some([25, 35, 36, 37].into_iter().map(ParticleID::new).collect()),
        }
    }
}
//
impl Configuration {
    /// Load the configuration from a file, check it, and print it out
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_str = fs::read_to_string(path)
            .wrap_err_with(|| format!("Could not read configuration file {}", path.display()))?;
        let config = Self::parse(&config_str)?;
        config.print();
        Ok(config)
    }

    /// Load the configuration pointed to by `HIGGS_TRACER_CONFIG`, or use
    /// the defaults if that variable is not set
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => Self::load(path),
            None => {
                info!("{CONFIG_ENV_VAR} is not set, using the default configuration");
                let config = Self::default();
                config.check()?;
                config.print();
                Ok(config)
            }
        }
    }

    /// Decode and check a configuration from the text of a configuration file
    pub fn parse(config_str: &str) -> Result<Self> {
        // Configuration items are the first non-whitespace chunk of text on
        // each line, the rest is commentary. Blank lines are ignored.
        let mut config_iter = config_str
            .lines()
            .filter_map(|line| line.split_whitespace().next());

        let mut next_item = |name: &'static str| -> Result<ConfigItem> {
            config_iter
                .next()
                .map(|data| ConfigItem::new(name, data))
                .ok_or_else(|| eyre!("Missing configuration of {}", name))
        };

        let config = Configuration {
            num_events: next_item("num_events")?.parse::<usize>()?,
            seed: next_item("seed")?.parse::<u64>()?,
            e_cm: next_item("e_cm")?.parse::<Float>()?,
            higgs_mass: next_item("higgs_mass")?.parse::<Float>()?,
            failure_rate: next_item("failure_rate")?.parse::<Float>()?,
            frac_ggf: next_item("frac_ggf")?.parse::<Float>()?,
            frac_vbf: next_item("frac_vbf")?.parse::<Float>()?,
            frac_vh: next_item("frac_vh")?.parse::<Float>()?,
            frac_tth: next_item("frac_tth")?.parse::<Float>()?,
            higgs_ids: next_item("higgs_ids")?
                .parse_list::<i32>()?
                .into_iter()
                .map(ParticleID::new)
                .collect(),
            decayed_statuses: next_item("decayed_statuses")?.parse_list::<i32>()?,
            min_decay_products: next_item("min_decay_products")?.parse::<usize>()?,
            subset_masses: next_item("subset_masses")?.parse_bool()?,
            clustering: next_item("clustering")?.parse_bool()?,
            jet_definition: JetDefinition {
                algorithm: next_item("jet_algorithm")?.parse::<JetAlgorithm>()?,
                radius: next_item("jet_radius")?.parse::<Float>()?,
                min_pt: next_item("jet_min_pt")?.parse::<Float>()?,
            },
            jet_multiplicity_pt: next_item("jet_multiplicity_pt")?.parse::<Float>()?,
            lhe_file: next_item("lhe_file")?.parse_path(),
            particle_dump: next_item("particle_dump")?.parse_path(),
            particle_dump_ids: next_item("particle_dump_ids")?.parse_species()?,
        };

        config.check()?;
        Ok(config)
    }

    /// Check that the configuration makes sense
    pub fn check(&self) -> Result<()> {
        ensure!(self.num_events > 0, "Please simulate at least one event");
        ensure!(self.higgs_mass > 0., "The Higgs mass must be positive");
        ensure!(
            (0. ..1.).contains(&self.failure_rate),
            "The failure rate must lie in [0, 1)"
        );
        let fractions = [self.frac_ggf, self.frac_vbf, self.frac_vh, self.frac_tth];
        ensure!(
            fractions.iter().all(|&frac| frac >= 0.),
            "Production process fractions cannot be negative"
        );
        ensure!(
            fractions.iter().sum::<Float>() > 0.,
            "At least one production process must be enabled"
        );
        let threshold = evgen::production_threshold(self.higgs_mass, self.frac_tth > 0.);
        ensure!(
            self.e_cm > threshold,
            "The collision energy must exceed the production threshold of {threshold} GeV"
        );
        ensure!(!self.higgs_ids.is_empty(), "Please select at least one Higgs species");
        ensure!(
            !self.decayed_statuses.is_empty(),
            "Please select at least one Higgs status"
        );
        ensure!(self.jet_definition.radius > 0., "The jet radius must be positive");
        ensure!(
            self.jet_definition.min_pt >= 0.,
            "The minimal jet transverse momentum cannot be negative"
        );
        Ok(())
    }

    /// Display the configuration
    pub fn print(&self) {
        let ids: Vec<_> = self.higgs_ids.iter().map(|id| id.id()).collect();
        info!("num_events          : {}", self.num_events);
        info!("seed                : {}", self.seed);
        info!("e_cm                : {}", self.e_cm);
        info!("higgs_mass          : {}", self.higgs_mass);
        info!("failure_rate        : {}", self.failure_rate);
        info!("frac_ggf            : {}", self.frac_ggf);
        info!("frac_vbf            : {}", self.frac_vbf);
        info!("frac_vh             : {}", self.frac_vh);
        info!("frac_tth            : {}", self.frac_tth);
        info!("higgs_ids           : {:?}", ids);
        info!("decayed_statuses    : {:?}", self.decayed_statuses);
        info!("min_decay_products  : {}", self.min_decay_products);
        info!("subset_masses       : {}", self.subset_masses);
        info!("clustering          : {}", self.clustering);
        info!("jet_algorithm       : {}", self.jet_definition.algorithm);
        info!("jet_radius          : {}", self.jet_definition.radius);
        info!("jet_min_pt          : {}", self.jet_definition.min_pt);
        info!("jet_multiplicity_pt : {}", self.jet_multiplicity_pt);
        match &self.lhe_file {
            Some(path) => info!("lhe_file            : {}", path.display()),
            None => info!("lhe_file            : none"),
        }
        match &self.particle_dump {
            Some(path) => info!("particle_dump       : {}", path.display()),
            None => info!("particle_dump       : none"),
        }
        match &self.particle_dump_ids {
            Some(ids) => {
                let ids: Vec<_> = ids.iter().map(|id| id.id()).collect();
                info!("particle_dump_ids   : {:?}", ids)
            }
            None => info!("particle_dump_ids   : all"),
        }
    }
}

/// A value from the configuration file, tagged with the struct field which it
/// is supposed to map for error reporting purposes.
struct ConfigItem<'data> {
    name: &'static str,
    data: &'data str,
}
//
impl<'data> ConfigItem<'data> {
    /// Build a config item from a struct field tag and raw iterator data
    fn new(name: &'static str, data: &'data str) -> Self {
        Self { name, data }
    }

    /// Parse this data using Rust's standard parsing logic
    fn parse<T: FromStr>(self) -> Result<T>
    where
        <T as FromStr>::Err: std::error::Error + Send + Sync + 'static,
    {
        self.data
            .parse::<T>()
            .wrap_err_with(|| format!("Could not parse configuration of {}", self.name))
    }

    /// Parse this data using special logic which handles Fortran's bool syntax
    fn parse_bool(self) -> Result<bool> {
        match self.data.to_lowercase().as_str() {
            ".true." => Ok(true),
            ".false." => Ok(false),
            _ => self.parse::<bool>(),
        }
    }

    /// Parse a comma-separated list of values
    fn parse_list<T: FromStr>(self) -> Result<Vec<T>>
    where
        <T as FromStr>::Err: std::error::Error + Send + Sync + 'static,
    {
        self.data
            .split(',')
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                entry.parse::<T>().wrap_err_with(|| {
                    format!("Could not parse entry {entry:?} of configuration of {}", self.name)
                })
            })
            .collect()
    }

    /// Parse a comma-separated list of species, "all" meaning any species
    fn parse_species(self) -> Result<Option<Vec<ParticleID>>> {
        if self.data.eq_ignore_ascii_case("all") {
            return Ok(None);
        }
        let ids = self.parse_list::<i32>()?;
        Ok(Some(ids.into_iter().map(ParticleID::new).collect()))
    }

    /// Interpret this data as an optional path, "none" meaning no path
    fn parse_path(self) -> Option<PathBuf> {
        if self.data.eq_ignore_ascii_case("none") {
            None
        } else {
            Some(PathBuf::from(self.data))
        }
    }
}
