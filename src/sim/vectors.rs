use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Lane patterns for the low six input bits of an exhaustive sweep: lane `l`
/// of `PATTERNS[i]` holds bit `i` of `l`.
const PATTERNS: [u64; 6] = [
    0xAAAA_AAAA_AAAA_AAAA,
    0xCCCC_CCCC_CCCC_CCCC,
    0xF0F0_F0F0_F0F0_F0F0,
    0xFF00_FF00_FF00_FF00,
    0xFFFF_0000_FFFF_0000,
    0xFFFF_FFFF_0000_0000,
];

/// Exhaustive sweeps above this many inputs are never attempted, whatever the configured limit.
pub const MAX_EXHAUSTIVE_WIDTH: usize = 24;

/// A fixed population of input vectors, packed 64 per word.
///
/// `word(w)[i]` holds input `i` for the 64 vectors of word `w`. Lanes past the
/// end of the population are masked out by [`VectorSet::mask`].
#[derive(Clone, Debug)]
pub struct VectorSet {
    width: usize,
    len: u64,
    words: Vec<Vec<u64>>,
    exhaustive: bool,
}

fn lane_mask(len: u64, word: usize) -> u64 {
    let remaining = len - (word as u64) * 64;
    if remaining >= 64 {
        !0
    } else {
        (1u64 << remaining) - 1
    }
}

impl VectorSet {
    /// Every assignment of `width` inputs. Vector `v` sets input `i` to bit `i` of `v`.
    pub fn exhaustive(width: usize) -> Self {
        let len = 1u64 << width;
        let words = (0..len.div_ceil(64) as usize)
            .map(|w| {
                (0..width)
                    .map(|i| match i {
                        0..6 => PATTERNS[i],
                        _ if (w >> (i - 6)) & 1 == 1 => !0,
                        _ => 0,
                    })
                    .collect()
            })
            .collect();
        Self {
            width,
            len,
            words,
            exhaustive: true,
        }
    }

    /// `samples` uniformly random vectors drawn from a ChaCha20 stream seeded with `seed`.
    pub fn sampled(width: usize, samples: usize, seed: u64) -> Self {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let len = samples as u64;
        let words = (0..samples.div_ceil(64))
            .map(|_| (0..width).map(|_| rng.random::<u64>()).collect())
            .collect();
        Self {
            width,
            len,
            words,
            exhaustive: false,
        }
    }

    /// Exhaustive when `width <= exhaustive_limit`, sampled otherwise.
    pub fn for_width(width: usize, exhaustive_limit: u32, samples: usize, seed: u64) -> Self {
        if width <= (exhaustive_limit as usize).min(MAX_EXHAUSTIVE_WIDTH) {
            Self::exhaustive(width)
        } else {
            Self::sampled(width, samples.max(1), seed)
        }
    }

    /// A population holding the single vector `bits`.
    pub fn single(bits: &[bool]) -> Self {
        Self {
            width: bits.len(),
            len: 1,
            words: vec![bits.iter().map(|b| u64::from(*b)).collect()],
            exhaustive: false,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of vectors in the population.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_exhaustive(&self) -> bool {
        self.exhaustive
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn word(&self, w: usize) -> &[u64] {
        &self.words[w]
    }

    pub fn mask(&self, w: usize) -> u64 {
        lane_mask(self.len, w)
    }

    /// `(inputs, lane mask)` for every word.
    pub fn iter(&self) -> impl Iterator<Item = (&[u64], u64)> {
        self.words
            .iter()
            .enumerate()
            .map(|(w, words)| (words.as_slice(), self.mask(w)))
    }
}
