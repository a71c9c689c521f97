/// Genotype symbols: ancestral (reference) then derived
pub const DEFAULT_ALPHABET: [u8; 2] = [b'0', b'1'];

/// Joint counts of symbol pairs between two aligned genotype vectors.
///
/// Slots where either symbol falls outside the alphabet (missing calls such
/// as `.`) are not counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NuclCov {
    alphabet: [u8; 2],
    counts: [u64; 4],
}

impl NuclCov {
    pub fn new(alphabet: [u8; 2]) -> Self {
        Self {
            alphabet,
            counts: [0; 4],
        }
    }

    fn index(&self, symbol: u8) -> Option<usize> {
        self.alphabet.iter().position(|a| *a == symbol)
    }

    /// Count one slot; returns false if the slot is not valid in both
    pub fn add(&mut self, a: u8, b: u8) -> bool {
        match (self.index(a), self.index(b)) {
            (Some(i), Some(j)) => {
                self.counts[i * 2 + j] += 1;
                true
            }
            _ => false,
        }
    }

    pub fn add_all(&mut self, a: &[u8], b: &[u8]) {
        for (x, y) in a.iter().zip(b.iter()) {
            self.add(*x, *y);
        }
    }

    /// number of slots called in both vectors
    pub fn n(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// `(xy, n)`: slots derived in both vectors, and slots called in both
    pub fn p11(&self) -> (u64, u64) {
        (self.counts[3], self.n())
    }

    /// `xy / n`, or `None` when no slot is called in both
    pub fn joint_derived_fraction(&self) -> Option<f64> {
        let (xy, n) = self.p11();
        (n > 0).then(|| xy as f64 / n as f64)
    }
}

/// Probability that a sample slot carries the derived allele at both sites
pub fn pair_statistic(a: &[u8], b: &[u8]) -> Option<f64> {
    let mut nc = NuclCov::new(DEFAULT_ALPHABET);
    nc.add_all(a, b);
    nc.joint_derived_fraction()
}
