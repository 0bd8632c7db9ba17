//! Static classification tables for the GN vocabulary.
//!
//! Pure lookups over immutable process-wide data: which functions declare
//! build targets, which variables are built in, and which variables hold
//! file- or label-shaped strings. Unknown names always resolve to an
//! all-false detail, never an error.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FunctionDetail {
    /// The function declares a build target (an executable, a library, ...).
    pub is_target: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VariableDetail {
    /// Available in every scope without being declared.
    pub is_builtin: bool,
    /// Literal values name files or paths.
    pub is_input: bool,
    /// Literal values name other declared targets. Implies `is_input`.
    pub is_label: bool,
}

/// Functions available in every scope, regardless of the enclosing target.
pub fn builtin_functions() -> &'static [&'static str] {
    BUILTIN_FUNCTIONS
}

/// Variables available in every scope.
pub fn builtin_variables() -> &'static [&'static str] {
    BUILTIN_VARIABLES
}

/// Names of the functions that declare a build target.
pub fn target_functions() -> impl Iterator<Item = &'static str> {
    TARGET_GROUPS.iter().map(|(name, _)| *name)
}

/// Variables legal inside the given target kind, duplicates removed. With no
/// kind, the union across every variable group.
pub fn target_variables(target: Option<&str>) -> Vec<&'static str> {
    let groups: Vec<&'static str> = match target {
        Some(target) => TARGET_GROUPS
            .iter()
            .find(|(name, _)| *name == target)
            .map(|(_, groups)| groups.to_vec())
            .unwrap_or_default(),
        None => GROUP_VARIABLES.iter().map(|(name, _)| *name).collect(),
    };
    let mut seen = HashSet::new();
    let mut variables = Vec::new();
    for group in groups {
        if let Some((_, names)) = GROUP_VARIABLES.iter().find(|(name, _)| *name == group) {
            for name in *names {
                if seen.insert(*name) {
                    variables.push(*name);
                }
            }
        }
    }
    variables
}

pub fn function_detail(name: Option<&str>) -> FunctionDetail {
    let Some(name) = name else {
        return FunctionDetail::default();
    };
    FunctionDetail {
        is_target: TARGET_GROUPS.iter().any(|(target, _)| *target == name),
    }
}

pub fn variable_detail(name: Option<&str>) -> VariableDetail {
    let Some(name) = name else {
        return VariableDetail::default();
    };
    if BUILTIN_VARIABLES.contains(&name) {
        return VariableDetail {
            is_builtin: true,
            ..VariableDetail::default()
        };
    }
    VARIABLE_DETAILS.get(name).copied().unwrap_or_default()
}

static BUILTIN_FUNCTIONS: &[&str] = &[
    "assert",
    "declare_args",
    "defined",
    "exec_script",
    "filter_exclude",
    "filter_include",
    "foreach",
    "forward_variables_from",
    "get_label_info",
    "get_path_info",
    "get_target_outputs",
    "getenv",
    "import",
    "not_needed",
    "pool",
    "print",
    "process_file_template",
    "read_file",
    "rebase_path",
    "set_default_toolchain",
    "set_defaults",
    "split_list",
    "string_join",
    "string_replace",
    "string_split",
    "template",
    "tool",
    "toolchain",
    "write_file",
];

static BUILTIN_VARIABLES: &[&str] = &[
    "current_cpu",
    "current_os",
    "current_toolchain",
    "default_toolchain",
    "gn_version",
    "host_cpu",
    "host_os",
    "invoker",
    "python_path",
    "root_build_dir",
    "root_gen_dir",
    "root_out_dir",
    "target_cpu",
    "target_gen_dir",
    "target_name",
    "target_os",
    "target_out_dir",
];

/// Target-declaring functions and the variable groups legal inside each.
static TARGET_GROUPS: &[(&str, &[&str])] = &[
    ("action", &["action"]),
    ("action_foreach", &["action"]),
    ("bundle_data", &["copy"]),
    ("config", &["flags", "configs"]),
    ("copy", &["copy"]),
    ("create_bundle", &["bundle"]),
    (
        "executable",
        &["general", "deps", "flags", "configs", "rust", "swift"],
    ),
    ("generated_file", &["deps", "configs", "generate"]),
    ("group", &["deps", "configs"]),
    (
        "loadable_module",
        &["general", "deps", "flags", "configs", "rust", "rust_extra", "swift"],
    ),
    (
        "rust_library",
        &["general", "deps", "flags", "configs", "rust"],
    ),
    (
        "rust_proc_macro",
        &["general", "deps", "flags", "configs", "rust"],
    ),
    (
        "shared_library",
        &["general", "deps", "flags", "configs", "rust", "rust_extra", "swift"],
    ),
    ("source_set", &["general", "deps", "flags", "configs"]),
    (
        "static_library",
        &["general", "deps", "flags", "configs", "static", "rust", "swift"],
    ),
];

static GROUP_VARIABLES: &[(&str, &[&str])] = &[
    (
        "general",
        &[
            "check_includes",
            "data",
            "friend",
            "inputs",
            "metadata",
            "output_dir",
            "output_extension",
            "output_name",
            "output_prefix_override",
            "public",
            "sources",
            "testonly",
            "visibility",
        ],
    ),
    (
        "deps",
        &[
            "allow_circular_includes_from",
            "assert_no_deps",
            "data_deps",
            "deps",
            "public_deps",
            "write_runtime_deps",
        ],
    ),
    (
        "flags",
        &[
            "arflags",
            "asmflags",
            "cflags_c",
            "cflags_cc",
            "cflags_objc",
            "cflags_objcc",
            "cflags",
            "configs",
            "defines",
            "externs",
            "framework_dirs",
            "frameworks",
            "include_dirs",
            "inputs",
            "ldflags",
            "lib_dirs",
            "libs",
            "precompiled_header_type",
            "precompiled_header",
            "precompiled_source",
            "rustenv",
            "rustflags",
            "swiftflags",
            "weak_frameworks",
        ],
    ),
    ("configs", &["all_dependent_configs", "public_configs"]),
    (
        "copy",
        &[
            "data_deps",
            "deps",
            "metadata",
            "outputs",
            "public_deps",
            "sources",
            "visibility",
        ],
    ),
    (
        "action",
        &[
            "args",
            "data_deps",
            "data",
            "depfile",
            "deps",
            "inputs",
            "metadata",
            "outputs",
            "pool",
            "response_file_contents",
            "script",
            "sources",
        ],
    ),
    (
        "generate",
        &["contents", "data_keys", "output_conversion", "rebase", "walk_keys"],
    ),
    ("static", &["complete_static_lib"]),
    (
        "bundle",
        &[
            "bundle_contents_dir",
            "bundle_deps_filter",
            "bundle_executable_dir",
            "bundle_resources_dir",
            "bundle_root_dir",
            "code_signing_args",
            "code_signing_outputs",
            "code_signing_script",
            "code_signing_sources",
            "data_deps",
            "deps",
            "metadata",
            "partial_info_plist",
            "product_type",
            "public_deps",
            "visibility",
            "xcasset_compiler_flags",
            "xcode_extra_attributes",
            "xcode_test_application_name",
        ],
    ),
    ("rust", &["aliased_deps", "crate_name", "crate_root"]),
    ("rust_extra", &["crate_type"]),
    ("swift", &["bridge_header", "module_name"]),
];

/// Non-default variable classifications. Variables absent here and from
/// [`BUILTIN_VARIABLES`] carry no flags.
static VARIABLE_DETAILS: Lazy<HashMap<&'static str, VariableDetail>> = Lazy::new(|| {
    const INPUT: VariableDetail = VariableDetail {
        is_builtin: false,
        is_input: true,
        is_label: false,
    };
    const LABEL: VariableDetail = VariableDetail {
        is_builtin: false,
        is_input: true,
        is_label: true,
    };
    let mut details = HashMap::new();
    for name in [
        "all_dependent_configs",
        "allow_circular_includes_from",
        "assert_no_deps",
        "bundle_deps_filter",
        "configs",
        "data_deps",
        "deps",
        "friend",
        "pool",
        "public_configs",
        "public_deps",
        "visibility",
    ] {
        details.insert(name, LABEL);
    }
    for name in [
        "bridge_header",
        "code_signing_script",
        "code_signing_sources",
        "data",
        "framework_dirs",
        "include_dirs",
        "inputs",
        "lib_dirs",
        "precompiled_header",
        "precompiled_source",
        "public",
        "script",
        "sources",
    ] {
        details.insert(name, INPUT);
    }
    details
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn builtin_variables_report_only_the_builtin_flag() {
        for name in builtin_variables() {
            let detail = variable_detail(Some(name));
            assert!(detail.is_builtin, "{name} must be builtin");
            assert!(!detail.is_input, "{name} must not be input");
            assert!(!detail.is_label, "{name} must not be label");
        }
    }

    #[test]
    fn classified_variables_match_the_table() {
        let deps = variable_detail(Some("deps"));
        assert!(deps.is_input && deps.is_label && !deps.is_builtin);

        let sources = variable_detail(Some("sources"));
        assert!(sources.is_input && !sources.is_label);

        let cflags = variable_detail(Some("cflags"));
        assert_eq!(cflags, VariableDetail::default());
    }

    #[test]
    fn unknown_and_absent_names_resolve_to_defaults() {
        assert_eq!(variable_detail(Some("no_such_variable")), VariableDetail::default());
        assert_eq!(variable_detail(None), VariableDetail::default());
        assert_eq!(function_detail(Some("no_such_function")), FunctionDetail::default());
        assert_eq!(function_detail(None), FunctionDetail::default());
    }

    #[test]
    fn target_functions_are_targets_and_builtins_are_not() {
        for name in target_functions() {
            assert!(function_detail(Some(name)).is_target, "{name} must be a target");
        }
        assert!(!function_detail(Some("template")).is_target);
        assert!(!function_detail(Some("foreach")).is_target);
    }

    #[test]
    fn target_variables_have_no_duplicates() {
        for kind in target_functions() {
            let variables = target_variables(Some(kind));
            let unique: HashSet<_> = variables.iter().collect();
            assert_eq!(unique.len(), variables.len(), "duplicates for {kind}");
        }
    }

    #[test]
    fn union_over_all_kinds_equals_the_unfiltered_union() {
        let mut union = BTreeSet::new();
        for kind in target_functions() {
            union.extend(target_variables(Some(kind)));
        }
        let all: BTreeSet<_> = target_variables(None).into_iter().collect();
        assert_eq!(union, all);
    }

    #[test]
    fn executable_carries_its_groups() {
        let variables = target_variables(Some("executable"));
        for expected in ["sources", "deps", "cflags", "public_configs", "crate_name", "module_name"] {
            assert!(variables.contains(&expected), "executable must allow {expected}");
        }
        assert!(!variables.contains(&"complete_static_lib"));
        assert!(target_variables(Some("no_such_kind")).is_empty());
    }
}
