use std::io::{self, Write};

/// Counters kept by the interconnect, reported when the simulation finishes.
#[derive(Clone, Debug, Default)]
pub struct Stats {
    snoops: Vec<u64>,
    accesses: Vec<u64>,
    latency: Vec<u64>,      // ticks, summed over completed accesses
    cp_dir_accesses: u64,
}

impl Stats {
    pub fn new(num_procs: usize) -> Self {
        Stats {
            snoops: vec![0; num_procs],
            accesses: vec![0; num_procs],
            latency: vec![0; num_procs],
            cp_dir_accesses: 0,
        }
    }

    pub fn record_snoop(&mut self, proc: usize) {
        self.snoops[proc] += 1;
    }

    pub fn record_dir_access(&mut self) {
        self.cp_dir_accesses += 1;
    }

    pub fn record_access(&mut self, proc: usize, latency: u64) {
        self.accesses[proc] += 1;
        self.latency[proc] += latency;
    }

    pub fn snoops(&self, proc: usize) -> u64 {
        self.snoops[proc]
    }

    pub fn accesses(&self, proc: usize) -> u64 {
        self.accesses[proc]
    }

    pub fn total_latency(&self, proc: usize) -> u64 {
        self.latency[proc]
    }

    pub fn dir_accesses(&self) -> u64 {
        self.cp_dir_accesses
    }

    /// `None` for a processor that never completed an access.
    pub fn average_access_time(&self, proc: usize) -> Option<f64> {
        match self.accesses[proc] {
            0 => None,
            n => Some(self.latency[proc] as f64 / n as f64),
        }
    }

    pub fn write_report(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "Interconnect Stats")?;
        writeln!(w, "Number of Snoops Received")?;
        for (i, n) in self.snoops.iter().enumerate() {
            writeln!(w, "  Core {}: {}", i, n)?;
        }
        writeln!(w, "Number of Critical Path Directory Accesses: {}", self.cp_dir_accesses)?;
        writeln!(w, "Number of Accesses:")?;
        for (i, n) in self.accesses.iter().enumerate() {
            writeln!(w, "  Core {}: {}", i, n)?;
        }
        writeln!(w, "Average Memory Access Time (AMAT):")?;
        for i in 0..self.accesses.len() {
            match self.average_access_time(i) {
                Some(t) => writeln!(w, "  Core {}: {:.2}", i, t)?,
                None => writeln!(w, "  Core {}: n/a", i)?,
            }
        }
        Ok(())
    }
}
