//! Matrix expansion key tables.
//!
//! A build fans out into one job per combination of the values of its matrix
//! keys. Which keys qualify depends on the language: `rvm` multiplies a Ruby
//! build but means nothing to a Go build.

use crate::NormalizeOptions;
use rivet_core::BuildConfig;
use rivet_core::config::first_str;

/// Language used when the config names none or an unknown one.
pub const DEFAULT_LANG: &str = "ruby";

/// Every key that can select a runtime version or environment.
pub const ENV_KEYS: [&str; 29] = [
    "compiler",
    "crystal",
    "csharp",
    "d",
    "dart",
    "elixir",
    "env",
    "fsharp",
    "gemfile",
    "ghc",
    "go",
    "haxe",
    "jdk",
    "julia",
    "mono",
    "node_js",
    "otp_release",
    "perl",
    "perl6",
    "php",
    "python",
    "ruby",
    "rust",
    "rvm",
    "scala",
    "smalltalk",
    "visualbasic",
    "xcode_scheme",
    "xcode_sdk",
];

/// Keys added when multi-OS builds are enabled.
pub const EXPANSION_KEYS_FEATURE: [&str; 1] = ["os"];

/// Keys added when dist/group expansion is enabled.
pub const EXPANSION_KEYS_DIST_GROUP: [&str; 2] = ["dist", "group"];

/// Keys that always expand, whatever the language.
pub const EXPANSION_KEYS_UNIVERSAL: [&str; 2] = ["env", "branch"];

const RUBY_KEYS: &[&str] = &["rvm", "gemfile", "jdk", "ruby"];

/// Per-language expansion keys, `None` for unknown languages.
pub fn language_keys(language: &str) -> Option<&'static [&'static str]> {
    let keys: &'static [&'static str] = match language {
        "c" | "c++" | "cpp" => &["compiler"],
        "clojure" => &["lein", "jdk"],
        "crystal" => &["crystal"],
        "csharp" => &["csharp", "mono"],
        "d" => &["d"],
        "dart" => &["dart"],
        "elixir" => &["elixir", "otp_release"],
        "erlang" => &["otp_release"],
        "fsharp" => &["fsharp", "mono"],
        "go" => &["go"],
        "groovy" => &["jdk"],
        "haskell" => &["ghc"],
        "haxe" => &["haxe"],
        "java" => &["jdk"],
        "julia" => &["julia"],
        "node_js" => &["node_js"],
        "objective-c" => &["rvm", "gemfile", "xcode_sdk", "xcode_scheme"],
        "perl" => &["perl"],
        "perl6" => &["perl6"],
        "php" => &["php"],
        "python" => &["python"],
        "ruby" => RUBY_KEYS,
        "rust" => &["rust"],
        "scala" => &["scala", "jdk"],
        "smalltalk" => &["smalltalk"],
        "visualbasic" => &["visualbasic", "mono"],
        _ => return None,
    };
    Some(keys)
}

/// Languages with an entry in the key table.
pub const LANGUAGES: [&str; 28] = [
    "c",
    "c++",
    "clojure",
    "cpp",
    "crystal",
    "csharp",
    "d",
    "dart",
    "elixir",
    "erlang",
    "fsharp",
    "go",
    "groovy",
    "haskell",
    "haxe",
    "java",
    "julia",
    "node_js",
    "objective-c",
    "perl",
    "perl6",
    "php",
    "python",
    "ruby",
    "rust",
    "scala",
    "smalltalk",
    "visualbasic",
];

/// The language a config builds, before defaults are applied.
pub fn language_of(config: &BuildConfig) -> &str {
    config
        .get("language")
        .and_then(first_str)
        .unwrap_or(DEFAULT_LANG)
}

/// Every key eligible to expand a build in the config's language.
///
/// Ordered: language keys in [`ENV_KEYS`] order, then feature keys, then
/// the universal keys not already present.
pub fn matrix_keys(config: &BuildConfig, options: &NormalizeOptions) -> Vec<&'static str> {
    let allowed = language_keys(language_of(config)).unwrap_or(RUBY_KEYS);

    let mut keys: Vec<&'static str> = ENV_KEYS
        .iter()
        .copied()
        .filter(|key| allowed.contains(key))
        .collect();

    if options.multi_os {
        keys.extend(EXPANSION_KEYS_FEATURE);
    }
    if options.dist_group_expansion {
        keys.extend(EXPANSION_KEYS_DIST_GROUP);
    }
    for key in EXPANSION_KEYS_UNIVERSAL {
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys
}

/// The matrix keys actually present in the config.
pub fn matrix_keys_for(config: &BuildConfig, options: &NormalizeOptions) -> Vec<&'static str> {
    matrix_keys(config, options)
        .into_iter()
        .filter(|key| config.contains_key(key))
        .collect()
}
