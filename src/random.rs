// src/random.rs
//! Детерминированный источник случайности
//!
//! Поток задаётся сидом и алгоритмом. Дочерние потоки выводятся хешированием
//! `(сид родителя, тег фазы, индекс)` и никогда не сдвигают курсор родителя,
//! поэтому любая фаза может получить независимый поток в любом порядке.
//!
//! Сиды-строки канонизируются 64-битным FNV-1a по байтам UTF-8.
//! Пробелы по краям строки отбрасываются; строка, которая после этого разбирается
//! как `i64`, считается числовым сидом.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

use crate::checksum::fnv1a;
use crate::error::MapError;

/// Алгоритм генератора псевдослучайных чисел
///
/// Эталонные контрольные суммы определены для `Pcg64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RandomAlgorithm {
    /// PCG XSL RR 128/64 — алгоритм по умолчанию
    #[default]
    Pcg64,
    /// ChaCha с 8 раундами — тоже переносим, но не эталонный
    ChaCha8,
}

impl FromStr for RandomAlgorithm {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pcg" | "pcg64" => Ok(RandomAlgorithm::Pcg64),
            "chacha" | "chacha8" => Ok(RandomAlgorithm::ChaCha8),
            other => Err(MapError::config(format!(
                "unknown random algorithm `{other}` (expected pcg64 or chacha8)"
            ))),
        }
    }
}

impl fmt::Display for RandomAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RandomAlgorithm::Pcg64 => f.write_str("pcg64"),
            RandomAlgorithm::ChaCha8 => f.write_str("chacha8"),
        }
    }
}

/// Сид генерации: число или произвольная строка
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Seed {
    Numeric(i64),
    Text(String),
}

impl Seed {
    /// Канонический 64-битный сид
    #[must_use]
    pub fn canonical(&self) -> u64 {
        match self {
            Seed::Numeric(n) => *n as u64,
            Seed::Text(s) => fnv1a(s.as_bytes()),
        }
    }
}

impl Default for Seed {
    fn default() -> Self {
        Seed::Numeric(0)
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seed::Numeric(n) => write!(f, "{n}"),
            Seed::Text(s) => write!(f, "{s:?}"),
        }
    }
}

impl FromStr for Seed {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(match s.parse::<i64>() {
            Ok(n) => Seed::Numeric(n),
            Err(_) => Seed::Text(s.to_string()),
        })
    }
}

impl From<i64> for Seed {
    fn from(n: i64) -> Self {
        Seed::Numeric(n)
    }
}

impl From<i32> for Seed {
    fn from(n: i32) -> Self {
        Seed::Numeric(i64::from(n))
    }
}

impl From<u32> for Seed {
    fn from(n: u32) -> Self {
        Seed::Numeric(i64::from(n))
    }
}

impl From<u64> for Seed {
    fn from(n: u64) -> Self {
        Seed::Numeric(n as i64)
    }
}

impl From<&str> for Seed {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(seed) => seed,
            Err(never) => match never {},
        }
    }
}

impl From<String> for Seed {
    fn from(s: String) -> Self {
        Seed::from(s.as_str())
    }
}

/// Финализатор SplitMix64
pub(crate) fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

/// Сид дочернего потока для `(parent, phase, index)`
#[must_use]
pub fn derive_seed(parent: u64, phase: &str, index: u64) -> u64 {
    splitmix64(parent ^ fnv1a(phase.as_bytes()) ^ splitmix64(index))
}

#[derive(Debug, Clone)]
enum Engine {
    Pcg(Pcg64),
    ChaCha(ChaCha8Rng),
}

/// Поток случайных чисел с выводимыми дочерними потоками
#[derive(Debug, Clone)]
pub struct RandomSource {
    seed: u64,
    algorithm: RandomAlgorithm,
    engine: Engine,
}

impl RandomSource {
    #[must_use]
    pub fn new(seed: u64, algorithm: RandomAlgorithm) -> Self {
        let engine = match algorithm {
            RandomAlgorithm::Pcg64 => Engine::Pcg(Pcg64::seed_from_u64(seed)),
            RandomAlgorithm::ChaCha8 => Engine::ChaCha(ChaCha8Rng::seed_from_u64(seed)),
        };
        Self {
            seed,
            algorithm,
            engine,
        }
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub fn algorithm(&self) -> RandomAlgorithm {
        self.algorithm
    }

    /// Независимый поток для фазы `phase` и индекса `index`.
    ///
    /// Зависит только от сида этого потока, но не от того, сколько чисел из него уже взято.
    #[must_use]
    pub fn child(&self, phase: &str, index: u64) -> Self {
        Self::new(derive_seed(self.seed, phase, index), self.algorithm)
    }
}

impl RngCore for RandomSource {
    fn next_u32(&mut self) -> u32 {
        match &mut self.engine {
            Engine::Pcg(rng) => rng.next_u32(),
            Engine::ChaCha(rng) => rng.next_u32(),
        }
    }

    fn next_u64(&mut self) -> u64 {
        match &mut self.engine {
            Engine::Pcg(rng) => rng.next_u64(),
            Engine::ChaCha(rng) => rng.next_u64(),
        }
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        match &mut self.engine {
            Engine::Pcg(rng) => rng.fill_bytes(dest),
            Engine::ChaCha(rng) => rng.fill_bytes(dest),
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        match &mut self.engine {
            Engine::Pcg(rng) => rng.try_fill_bytes(dest),
            Engine::ChaCha(rng) => rng.try_fill_bytes(dest),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn draw(rng: &mut RandomSource, n: usize) -> Vec<u64> {
        (0..n).map(|_| rng.next_u64()).collect()
    }

    #[test]
    fn test_same_seed_same_stream() {
        for algorithm in [RandomAlgorithm::Pcg64, RandomAlgorithm::ChaCha8] {
            let mut a = RandomSource::new(12345, algorithm);
            let mut b = RandomSource::new(12345, algorithm);
            assert_eq!(draw(&mut a, 16), draw(&mut b, 16));
        }
    }

    #[test]
    fn test_child_does_not_depend_on_parent_cursor() {
        let fresh = RandomSource::new(7, RandomAlgorithm::Pcg64);
        let mut used = fresh.clone();
        let _ = draw(&mut used, 100);

        let mut c1 = fresh.child("heightmap", 3);
        let mut c2 = used.child("heightmap", 3);
        assert_eq!(draw(&mut c1, 8), draw(&mut c2, 8));
    }

    #[test]
    fn test_children_are_distinct() {
        let root = RandomSource::new(7, RandomAlgorithm::Pcg64);
        let a = root.child("heightmap", 0).seed();
        let b = root.child("heightmap", 1).seed();
        let c = root.child("sampling", 0).seed();
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn test_unit_floats_in_range() {
        let mut rng = RandomSource::new(99, RandomAlgorithm::Pcg64);
        for _ in 0..1000 {
            let v: f64 = rng.r#gen();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn test_seed_canonicalization() {
        assert_eq!(Seed::from(12345_i64).canonical(), 12345);
        assert_eq!(Seed::from(-1_i64).canonical(), u64::MAX);
        assert_eq!(Seed::from("12345"), Seed::Numeric(12345));
        assert_eq!(Seed::from("moria"), Seed::Text("moria".into()));
        assert_eq!(Seed::from(" moria\t"), Seed::from("moria"));
        assert_eq!(Seed::from(" 42 "), Seed::Numeric(42));
        assert_eq!(Seed::Text(String::new()).canonical(), 0xcbf2_9ce4_8422_2325);
        assert_eq!(Seed::from("a").canonical(), 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn test_algorithm_parsing() {
        assert_eq!("PCG".parse::<RandomAlgorithm>(), Ok(RandomAlgorithm::Pcg64));
        assert_eq!(
            "chacha8".parse::<RandomAlgorithm>(),
            Ok(RandomAlgorithm::ChaCha8)
        );
        let err = "mt19937".parse::<RandomAlgorithm>().unwrap_err();
        assert!(matches!(err, MapError::Configuration { .. }));
    }
}
