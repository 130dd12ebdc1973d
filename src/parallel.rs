// src/parallel.rs
//! Поклеточные отображения, параллельные при включённой фиче `parallel`.
//!
//! Каждая задача пишет только в свой слот результата, порядок вывода
//! определяется индексом, поэтому результат совпадает с последовательным побитово.

/// Вычисляет `f(i)` для `i in 0..len` и собирает результаты по порядку индексов
pub(crate) fn map_indexed<T, F>(len: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        (0..len).into_par_iter().map(f).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        (0..len).map(f).collect()
    }
}
