//! §6 launch-artifact URL builder: the JRE, database distribution, and
//! executor bundle URLs shipped alongside every launched task.

use std::env;

/// Joins `base` and `resource` with a `/` and collapses any run of
/// consecutive slashes that is NOT immediately preceded by `:` (so
/// `https://host` keeps its `//` but `host//path///file` collapses to
/// `host/path/file`).
pub fn build_url(base: &str, resource: &str) -> String {
    let joined = format!("{}/{}", base.trim_end_matches('/'), resource.trim_start_matches('/'));
    collapse_slash_runs(&joined)
}

fn collapse_slash_runs(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut prev: Option<char> = None;
    while let Some(c) = chars.next() {
        if c == '/' && prev == Some('/') {
            // Already emitted one slash for this run; only re-emit if the
            // character directly preceding the run was ':'.
            let preceded_by_colon = out
                .as_bytes()
                .iter()
                .rev()
                .skip_while(|&&b| b == b'/')
                .next()
                .map(|&b| b == b':')
                .unwrap_or(false);
            if preceded_by_colon {
                out.push(c);
            }
            prev = Some(c);
            continue;
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

fn os_name() -> String {
    env::var("OS_NAME").unwrap_or_else(|_| {
        if cfg!(target_os = "macos") {
            "macosx".to_string()
        } else {
            "linux".to_string()
        }
    })
}

/// The three artifacts an executor needs to fetch to bring a node up:
/// an OS-qualified JRE archive, the version-qualified database
/// distribution, and the executor bundle itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchArtifacts {
    pub jre_url: String,
    pub database_distribution_url: String,
    pub executor_bundle_url: String,
}

pub fn launch_artifacts(base_url: &str, database_version: &str) -> LaunchArtifacts {
    let os = os_name();
    LaunchArtifacts {
        jre_url: build_url(base_url, &format!("jre-{os}.tar.gz")),
        database_distribution_url: build_url(
            base_url,
            &format!("apache-cassandra-{database_version}-bin.tar.gz"),
        ),
        executor_bundle_url: build_url(base_url, "executor.zip"),
    }
}
