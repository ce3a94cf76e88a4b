//! Classification of Higgs production mechanisms from the incoming partons

use std::{fmt, fs::File, io::BufRead, io::BufReader, path::Path};

use eyre::{ensure, eyre, Result, WrapErr};
use log::debug;
use particle_id::{
    sm_elementary_particles::{bottom, gluon},
    ParticleID,
};

/// LHEF status code of incoming particles
const LHEF_INCOMING: i32 = -1;

const UP: i32 = 2;
const TOP: i32 = 6;
const Z_BOSON: i32 = 23;
const W_BOSON: i32 = 24;

/// Higgs production mechanism
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum ProductionChannel {
    /// Not recognized
    #[default]
    Unknown = 0,
    /// gg → H
    GluonFusion = 1,
    /// ff' → H ff' via ZZ fusion
    VectorBosonFusionZ = 2,
    /// ff' → H ff' via WW fusion
    VectorBosonFusionW = 3,
    /// f fbar → H Z
    ZAssociated = 4,
    /// f fbar' → H W
    WAssociated = 5,
    /// gg → H t tbar
    GluonTopAssociated = 6,
    /// q qbar → H t tbar
    QuarkTopAssociated = 7,
}
//
impl ProductionChannel {
    /// Number of production channels
    pub const COUNT: usize = 8;

    /// Every production channel, in code order
    pub const ALL: [Self; Self::COUNT] = [
        Self::Unknown,
        Self::GluonFusion,
        Self::VectorBosonFusionZ,
        Self::VectorBosonFusionW,
        Self::ZAssociated,
        Self::WAssociated,
        Self::GluonTopAssociated,
        Self::QuarkTopAssociated,
    ];

    /// Numeric code, as written to the output
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Short human-readable name
    pub fn name(self) -> &'static str {
        use ProductionChannel::*;
        match self {
            Unknown => "unknown",
            GluonFusion => "ggH",
            VectorBosonFusionZ => "VBF(ZZ)",
            VectorBosonFusionW => "VBF(WW)",
            ZAssociated => "ZH",
            WAssociated => "WH",
            GluonTopAssociated => "ggttH",
            QuarkTopAssociated => "qqttH",
        }
    }
}

impl fmt::Display for ProductionChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn is_quark(id: i32) -> bool {
    (1..=TOP).contains(&id)
}

/// Infer the production channel from the two incoming partons
///
/// Antiparticle signs are ignored. Rules are tried in order, the first match
/// wins:
///
/// 1. two gluons: gluon fusion
/// 2. two quarks of different flavour, no up quark: ZZ fusion
/// 3. two quarks of different flavour, one up quark: WW fusion
/// 4. a quark and a Z: Z-associated production
/// 5. a quark and a W: W-associated production
/// 6. two top quarks: gluon-initiated tt̄H
/// 7. two quarks lighter than top: quark-initiated tt̄H
///
/// Anything else is `Unknown`.
pub fn classify(parton1: ParticleID, parton2: ParticleID) -> ProductionChannel {
    use ProductionChannel::*;
    let a = parton1.id().abs();
    let b = parton2.id().abs();
    let g = gluon.id();
    let quarks = is_quark(a) && is_quark(b);
    let paired_with = |boson: i32| (is_quark(a) && b == boson) || (is_quark(b) && a == boson);
    if a == g && b == g {
        GluonFusion
    } else if quarks && a != b && a != UP && b != UP {
        VectorBosonFusionZ
    } else if quarks && a != b && (a == UP || b == UP) {
        VectorBosonFusionW
    } else if paired_with(Z_BOSON) {
        ZAssociated
    } else if paired_with(W_BOSON) {
        WAssociated
    } else if a == TOP && b == TOP {
        GluonTopAssociated
    } else if quarks && a <= bottom.id() && b <= bottom.id() {
        QuarkTopAssociated
    } else {
        Unknown
    }
}

/// Classify every event of a Les Houches event file
///
/// The first two incoming particles of each event are taken as the partons.
/// Events with fewer incoming particles are classified as `Unknown`. The
/// result is in file order. A file without any event is an error.
pub fn channels_from_lhe<T: BufRead>(stream: T) -> Result<Vec<ProductionChannel>> {
    let mut reader =
        lhef::Reader::new(stream).map_err(|err| eyre!("Failed to read LHEF header: {err}"))?;
    let mut channels = Vec::new();
    loop {
        let event = reader
            .hepeup()
            .map_err(|err| eyre!("Failed to read LHEF event {}: {err}", channels.len()))?;
        let Some(event) = event else {
            break;
        };
        let incoming: Vec<_> = event
            .IDUP
            .iter()
            .zip(event.ISTUP.iter())
            .filter(|&(_, &status)| status == LHEF_INCOMING)
            .map(|(&id, _)| ParticleID::new(id))
            .take(2)
            .collect();
        let channel = match incoming[..] {
            [parton1, parton2] => classify(parton1, parton2),
            _ => ProductionChannel::Unknown,
        };
        channels.push(channel);
    }
    ensure!(
        !channels.is_empty(),
        "Could not determine production channels: no event in LHEF input"
    );
    debug!("Classified {} events from LHEF input", channels.len());
    Ok(channels)
}

/// Classify every event of a Les Houches event file on disk
pub fn channels_from_lhe_file(path: impl AsRef<Path>) -> Result<Vec<ProductionChannel>> {
    let path = path.as_ref();
    let file = File::open(path)
        .wrap_err_with(|| format!("Could not open LHE file {}", path.display()))?;
    channels_from_lhe(BufReader::new(file))
        .wrap_err_with(|| format!("Could not classify events in {}", path.display()))
}
