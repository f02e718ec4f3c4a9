use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

// persists one named table as a sequence of text lines
pub trait LineSink {
    fn persist(&mut self, name: &str, lines: &[String]) -> io::Result<()>;
}

// Content lands under <name>.tmp and is renamed once complete, so an
// interrupted run never leaves a partial table under its final name and a
// re-run overwrites wholesale.
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl LineSink for DirectorySink {
    fn persist(&mut self, name: &str, lines: &[String]) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let tmp = self.dir.join(format!("{}.tmp", name));
        let mut out = BufWriter::new(File::create(&tmp)?);
        for line in lines {
            writeln!(out, "{}", line)?;
        }
        out.flush()?;
        fs::rename(&tmp, self.dir.join(name))
    }
}

#[cfg(test)]
#[derive(Default)]
pub(crate) struct MemorySink {
    pub tables: Vec<(String, Vec<String>)>,
}

#[cfg(test)]
impl LineSink for MemorySink {
    fn persist(&mut self, name: &str, lines: &[String]) -> io::Result<()> {
        self.tables.push((name.to_string(), lines.to_vec()));
        Ok(())
    }
}

#[test]
fn test_directory_sink_roundtrip() {
    let dir = std::env::temp_dir().join(format!("msu-precompute-sink-{}", std::process::id()));
    let mut sink = DirectorySink::new(&dir);
    let lines = vec!["00ff".to_string(), "1234".to_string()];
    sink.persist("precompute_lut8_000.dat", &lines).unwrap();

    let written = fs::read_to_string(dir.join("precompute_lut8_000.dat")).unwrap();
    assert_eq!(written, "00ff\n1234\n");
    assert!(!dir.join("precompute_lut8_000.dat.tmp").exists());

    fs::remove_dir_all(&dir).unwrap();
}
