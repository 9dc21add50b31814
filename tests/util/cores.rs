// Integration tests for util/cores.rs — core count and default worker count.

use mtdec::config::NB_THREADS_MAX;
use mtdec::util::{count_cores, default_nb_threads};

#[test]
fn count_cores_is_positive_and_stable() {
    let first = count_cores();
    assert!(first >= 1);
    assert_eq!(first, count_cores());
}

#[test]
fn default_threads_are_bounded() {
    let n = default_nb_threads();
    assert!(n >= 1 && n <= NB_THREADS_MAX, "default_nb_threads() = {n}");
}

#[test]
fn env_override_is_clamped() {
    // Only this test touches the variable.
    std::env::set_var("MTDEC_NBTHREADS", "100000");
    assert_eq!(default_nb_threads(), NB_THREADS_MAX);
    std::env::set_var("MTDEC_NBTHREADS", "3");
    assert_eq!(default_nb_threads(), 3);
    std::env::set_var("MTDEC_NBTHREADS", "zero");
    assert_eq!(default_nb_threads(), count_cores().min(NB_THREADS_MAX));
    std::env::remove_var("MTDEC_NBTHREADS");
}
