//! This module is in charge of writing the decay records, the particle dump
//! and the run summary to disk

use crate::{
    accumulator::{ResultsAccumulator, RunStatistics},
    channel::ProductionChannel,
    config::Configuration,
    momentum::{self, X, Y, Z},
    numeric::Float,
    pipeline::{DecayRecord, JetMatch, ParticleRow},
};

use eyre::{Result, WrapErr};
use log::info;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use std::{
    fmt::{self, Display},
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    time::Duration,
};

/// Number of significant digits of floating-point output
const SIG_DIGITS: usize = 6;

/// Column names of the decay record file
pub const HEADER: &str = "event,higgs_index,higgs_id,production_channel,decay_products,inv_mass,\
                          subset_inv_masses,higgs_pt,higgs_rapidity,jet_pt,jet_eta,jet_phi,\
                          jet_mass,jet_id,jet_multiplicity";

/// Column names of the particle dump
pub const PARTICLE_HEADER: &str = "event_id,particle_id,mass,px,py,pz,eta";

/// Placeholder for missing associations and values that do not apply
const MISSING: &str = "-1";

/// Floating-point number printed like C's %g with 6 significant digits
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Engineering(pub Float);
//
impl Display for Engineering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_engineering(f, self.0, SIG_DIGITS)
    }
}

/// Write a floating-point number using "engineering" notation
///
/// Analogous to the %g format of the C printf function, this switches between
/// naive and scientific notation depending on the order of magnitude of the
/// number, and drops trailing zeros.
fn write_engineering(writer: &mut impl fmt::Write, x: Float, sig_digits: usize) -> fmt::Result {
    if x == 0. {
        // Zero is special because it has no order of magnitude
        return write!(writer, "0");
    }
    if !x.is_finite() {
        return write!(writer, "{x}");
    }

    // Rounding to the requested precision may bump the order of magnitude,
    // so we take it from the rounded scientific notation.
    let precision = sig_digits.max(1) - 1;
    let scientific = format!("{x:.precision$e}");
    let Some((mantissa, exponent)) = scientific
        .split_once('e')
        .and_then(|(mantissa, exponent)| Some((mantissa, exponent.parse::<i32>().ok()?)))
    else {
        return write!(writer, "{scientific}");
    };

    if exponent < -4 || exponent >= sig_digits as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        write!(
            writer,
            "{}e{sign}{:02}",
            trim_fraction(mantissa),
            exponent.abs()
        )
    } else {
        let decimals = (precision as i32 - exponent) as usize;
        let naive = format!("{x:.decimals$}");
        write!(writer, "{}", trim_fraction(&naive))
    }
}

/// Remove trailing zeros of a fractional part, and the decimal point if it
/// ends up last
fn trim_fraction(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}

/// Write `items` separated by semicolons
fn write_list<T: Display>(writer: &mut impl Write, items: impl IntoIterator<Item = T>) -> io::Result<()> {
    for (idx, item) in items.into_iter().enumerate() {
        if idx > 0 {
            write!(writer, ";")?;
        }
        write!(writer, "{item}")?;
    }
    Ok(())
}

/// Write one property of the matched jets, with placeholders for unmatched
/// decay products
fn write_jet_list(
    writer: &mut impl Write,
    jets: &[Option<JetMatch>],
    property: impl Fn(&JetMatch) -> String,
) -> io::Result<()> {
    write_list(
        writer,
        jets.iter()
            .map(|jet| jet.as_ref().map_or_else(|| MISSING.to_string(), &property)),
    )
}

/// Write one decay record as a line of the output file
pub fn write_record(writer: &mut impl Write, record: &DecayRecord) -> io::Result<()> {
    write!(
        writer,
        "{},{},{},{},",
        record.event,
        record.higgs_index,
        record.higgs_id.id(),
        record.channel.code()
    )?;
    write_list(writer, record.decay_products.iter().map(|id| id.id()))?;
    write!(writer, ",{},", Engineering(record.inv_mass))?;
    write_list(writer, record.subset_masses.iter().map(|&mass| Engineering(mass)))?;
    write!(
        writer,
        ",{},{},",
        Engineering(record.higgs_pt),
        Engineering(record.higgs_rapidity)
    )?;
    write_jet_list(writer, &record.jets, |jet| Engineering(jet.pt).to_string())?;
    write!(writer, ",")?;
    write_jet_list(writer, &record.jets, |jet| Engineering(jet.eta).to_string())?;
    write!(writer, ",")?;
    write_jet_list(writer, &record.jets, |jet| Engineering(jet.phi).to_string())?;
    write!(writer, ",")?;
    write_jet_list(writer, &record.jets, |jet| Engineering(jet.mass).to_string())?;
    write!(writer, ",")?;
    write_jet_list(writer, &record.jets, |jet| jet.ordinal.to_string())?;
    match record.jet_multiplicity {
        Some(multiplicity) => writeln!(writer, ",{multiplicity}"),
        None => writeln!(writer, ",{MISSING}"),
    }
}

/// Write one dumped particle as a line of the particle dump
pub fn write_particle(writer: &mut impl Write, row: &ParticleRow) -> io::Result<()> {
    let p = &row.momentum;
    writeln!(
        writer,
        "{},{},{},{},{},{},{}",
        row.event,
        row.id.id(),
        Engineering(momentum::mass(p)),
        Engineering(p[X]),
        Engineering(p[Y]),
        Engineering(p[Z]),
        Engineering(momentum::eta(p)),
    )
}

/// Line of a CSV output file
pub trait CsvRow {
    /// Column names
    const HEADER: &'static str;

    /// Write this row, including the line terminator
    fn write_row(&self, writer: &mut impl Write) -> io::Result<()>;
}
//
impl CsvRow for DecayRecord {
    const HEADER: &'static str = HEADER;

    fn write_row(&self, writer: &mut impl Write) -> io::Result<()> {
        write_record(writer, self)
    }
}
//
impl CsvRow for ParticleRow {
    const HEADER: &'static str = PARTICLE_HEADER;

    fn write_row(&self, writer: &mut impl Write) -> io::Result<()> {
        write_particle(writer, self)
    }
}

/// CSV file that is filled as batches of events complete
///
/// The header is written on creation, and every batch is flushed, so that an
/// interrupted run leaves a readable file behind.
pub struct CsvWriter<W: Write> {
    writer: W,
}
//
impl<W: Write> CsvWriter<W> {
    /// Start a CSV file with the header of `T`
    pub fn new<T: CsvRow>(mut writer: W) -> io::Result<Self> {
        writeln!(writer, "{}", T::HEADER)?;
        writer.flush()?;
        Ok(Self { writer })
    }

    /// Append a batch of rows
    pub fn write_batch<T: CsvRow>(&mut self, rows: &[T]) -> io::Result<()> {
        for row in rows {
            row.write_row(&mut self.writer)?;
        }
        self.writer.flush()
    }

    /// Get back the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Path of the summary file that goes with an output file
pub fn summary_path(output: &Path) -> PathBuf {
    let mut path = output.as_os_str().to_owned();
    path.push(".summary");
    PathBuf::from(path)
}

/// Create a buffered CSV file for rows of type `T`
fn create_csv<T: CsvRow>(path: &Path) -> Result<CsvWriter<BufWriter<File>>> {
    let file =
        File::create(path).wrap_err_with(|| format!("Could not create output file {}", path.display()))?;
    CsvWriter::new::<T>(BufWriter::new(file))
        .wrap_err_with(|| format!("Failed to write {}", path.display()))
}

/// Output files of an analysis run
pub struct OutputFiles {
    records_path: PathBuf,
    records: CsvWriter<BufWriter<File>>,
    particles: Option<(PathBuf, CsvWriter<BufWriter<File>>)>,
}
//
impl OutputFiles {
    /// Create the decay record file, and the particle dump if configured
    ///
    /// This happens before any event is simulated, so that an unwritable
    /// destination is detected early.
    pub fn create(cfg: &Configuration, records_path: &Path) -> Result<Self> {
        let records = create_csv::<DecayRecord>(records_path)?;
        let particles = match &cfg.particle_dump {
            Some(path) => Some((path.clone(), create_csv::<ParticleRow>(path)?)),
            None => None,
        };
        Ok(Self {
            records_path: records_path.to_owned(),
            records,
            particles,
        })
    }

    /// Write out the results of one batch of events
    pub fn write_batch(&mut self, results: &ResultsAccumulator) -> Result<()> {
        self.records
            .write_batch(&results.records)
            .wrap_err_with(|| format!("Failed to write {}", self.records_path.display()))?;
        if let Some((path, particles)) = &mut self.particles {
            particles
                .write_batch(&results.particles)
                .wrap_err_with(|| format!("Failed to write {}", path.display()))?;
        }
        Ok(())
    }

    /// Report the run statistics through the logger and the summary file
    pub fn finish(self, cfg: &Configuration, stats: &RunStatistics, elapsed_time: Duration) -> Result<()> {
        log_summary(stats);

        let summary_path = summary_path(&self.records_path);
        let timestamp = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .wrap_err("Failed to format the timestamp")?;
        let summary_file = File::create(&summary_path)
            .wrap_err_with(|| format!("Failed to create {}", summary_path.display()))?;
        write_summary(
            &mut BufWriter::new(summary_file),
            &timestamp,
            cfg,
            stats,
            elapsed_time,
        )
        .wrap_err_with(|| format!("Failed to write {}", summary_path.display()))
    }
}

/// Report the run statistics through the logger
fn log_summary(stats: &RunStatistics) {
    info!("Events requested   : {}", stats.requested_events);
    info!("Events generated   : {}", stats.generated_events);
    info!("Generation failures: {}", stats.failed_events);
    info!("Higgs candidates   : {}", stats.higgs_candidates);
    info!("Diphoton decays    : {}", stats.diphoton_decays);
    info!("Diphoton ratio     : {}", DiphotonRatio(stats));
    for channel in ProductionChannel::ALL {
        info!("  from {:<13}: {}", channel.to_string(), stats.candidates_from(channel));
    }
    info!("Records written    : {}", stats.records);
}

/// Display of the diphoton ratio, "n/a" if undefined
struct DiphotonRatio<'a>(&'a RunStatistics);
//
impl Display for DiphotonRatio<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.diphoton_ratio() {
            Some(ratio) => write!(f, "{}", Engineering(ratio)),
            None => write!(f, "n/a"),
        }
    }
}

/// Write the run summary
pub fn write_summary(
    writer: &mut impl Write,
    timestamp: &str,
    cfg: &Configuration,
    stats: &RunStatistics,
    elapsed_time: Duration,
) -> io::Result<()> {
    let elapsed_secs = elapsed_time.as_secs_f64() as Float;
    let secs_per_event = elapsed_secs / (stats.requested_events.max(1) as Float);
    writeln!(writer, "{timestamp}")?;
    writeln!(writer, "---------------------------------------------")?;
    write_entry(writer, "Collision energy (GeV)", Engineering(cfg.e_cm))?;
    write_entry(writer, "Random seed", cfg.seed)?;
    write_entry(writer, "Events requested", stats.requested_events)?;
    write_entry(writer, "Events generated", stats.generated_events)?;
    write_entry(writer, "Generation failures", stats.failed_events)?;
    write_entry(writer, "Higgs candidates", stats.higgs_candidates)?;
    for channel in ProductionChannel::ALL {
        write_entry(writer, &format!("  from {channel}"), stats.candidates_from(channel))?;
    }
    write_entry(writer, "Diphoton decays", stats.diphoton_decays)?;
    write_entry(writer, "Diphoton ratio", DiphotonRatio(stats))?;
    write_entry(writer, "Records written", stats.records)?;
    writeln!(writer, "---------------------------------------------")?;
    write_entry(writer, "Elapsed time (s)", Engineering(elapsed_secs))?;
    write_entry(writer, "Elapsed time per event (s)", Engineering(secs_per_event))?;
    writer.flush()
}

/// Key-value output that uses fixed-size columns for better readability
fn write_entry(writer: &mut impl Write, key: &str, value: impl Display) -> io::Result<()> {
    writeln!(writer, "{key:<31}: {value}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::momentum::momentum;
    use particle_id::ParticleID;

    fn engineering(x: Float) -> String {
        Engineering(x).to_string()
    }

    #[test]
    fn engineering_notation() {
        assert_eq!(engineering(0.), "0");
        assert_eq!(engineering(126.), "126");
        assert_eq!(engineering(125.000_000_1), "125");
        assert_eq!(engineering(3.141_592_65), "3.14159");
        assert_eq!(engineering(-0.25), "-0.25");
        assert_eq!(engineering(0.000_123_456_7), "0.000123457");
        assert_eq!(engineering(0.000_012_5), "1.25e-05");
        assert_eq!(engineering(1_234_567.), "1.23457e+06");
        assert_eq!(engineering(999_999.7), "1e+06");
        assert_eq!(engineering(100_000.), "100000");
    }

    fn record() -> DecayRecord {
        DecayRecord {
            event: 3,
            higgs_index: 5,
            higgs_id: ParticleID::new(25),
            channel: ProductionChannel::VectorBosonFusionW,
            decay_products: vec![ParticleID::new(5), ParticleID::new(-5)],
            inv_mass: 125.,
            subset_masses: vec![125.],
            higgs_pt: 42.5,
            higgs_rapidity: -0.5,
            jets: vec![
                Some(JetMatch {
                    ordinal: 1,
                    pt: 50.,
                    eta: 1.5,
                    phi: 3.,
                    mass: 8.25,
                }),
                None,
            ],
            jet_multiplicity: Some(2),
        }
    }

    #[test]
    fn record_line() {
        let mut csv = CsvWriter::new::<DecayRecord>(Vec::new()).unwrap();
        csv.write_batch(&[record()]).unwrap();
        let text = String::from_utf8(csv.into_inner()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], HEADER);
        assert_eq!(lines[0].split(',').count(), 15);
        assert_eq!(
            lines[1],
            "3,5,25,3,5;-5,125,125,42.5,-0.5,50;-1,1.5;-1,3;-1,8.25;-1,1;-1,2"
        );
    }

    #[test]
    fn missing_values() {
        let record = DecayRecord {
            jets: vec![None, None],
            jet_multiplicity: None,
            subset_masses: vec![],
            ..record()
        };
        let mut out = Vec::new();
        write_record(&mut out, &record).unwrap();
        let line = String::from_utf8(out).unwrap();
        assert_eq!(line, "3,5,25,3,5;-5,125,,42.5,-0.5,-1;-1,-1;-1,-1;-1,-1;-1,-1;-1,-1\n");
    }

    #[test]
    fn batches_are_appended_after_the_header() {
        let mut csv = CsvWriter::new::<DecayRecord>(Vec::new()).unwrap();
        let header_only = String::from_utf8(csv.writer.clone()).unwrap();
        assert_eq!(header_only, format!("{HEADER}\n"));
        csv.write_batch(&[record()]).unwrap();
        csv.write_batch::<DecayRecord>(&[]).unwrap();
        csv.write_batch(&[DecayRecord { event: 1000, ..record() }]).unwrap();
        let text = String::from_utf8(csv.into_inner()).unwrap();
        let events: Vec<_> = text
            .lines()
            .skip(1)
            .map(|line| line.split(',').next().unwrap())
            .collect();
        assert_eq!(events, vec!["3", "1000"]);
    }

    #[test]
    fn particle_line() {
        let row = ParticleRow {
            event: 12,
            id: ParticleID::new(25),
            momentum: momentum(130., 30., 0., 20.),
        };
        let mut csv = CsvWriter::new::<ParticleRow>(Vec::new()).unwrap();
        csv.write_batch(&[row]).unwrap();
        let text = String::from_utf8(csv.into_inner()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "event_id,particle_id,mass,px,py,pz,eta");
        let expected_mass = Engineering(momentum::mass(&row.momentum));
        let expected_eta = Engineering(momentum::eta(&row.momentum));
        assert_eq!(lines[1], format!("12,25,{expected_mass},30,0,20,{expected_eta}"));
    }

    #[test]
    fn summary_file() {
        let stats = RunStatistics {
            requested_events: 10,
            generated_events: 9,
            failed_events: 1,
            ..RunStatistics::default()
        };
        let mut out = Vec::new();
        write_summary(
            &mut out,
            "2024-01-01T00:00:00Z",
            &Configuration::default(),
            &stats,
            Duration::from_millis(500),
        )
        .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("2024-01-01T00:00:00Z\n"));
        assert!(text.contains("Diphoton ratio                 : n/a"));
        assert!(text.contains("  from VBF(WW)                 : 0"));
        assert!(text.contains("Elapsed time per event (s)     : 0.05"));
        assert_eq!(
            summary_path(Path::new("out/higgs.csv")),
            PathBuf::from("out/higgs.csv.summary")
        );
    }
}
