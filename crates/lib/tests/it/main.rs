/*! Integration tests for Graft.
 *
 * This test suite is organized as a single integration test binary
 * following the pattern described by matklad in
 * https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
 *
 * The module structure mirrors the main library structure:
 * - ops: Tests for the operation log (minting, self-description, decoding)
 * - store: Tests for the DocumentStore backends (in-memory and HTTP)
 * - sync: End-to-end pull/merge/push scenarios between two replicas
 * - typeindex: Tests for type-index decoding and container discovery
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("graft=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

mod ops;
mod store;
mod typeindex;
