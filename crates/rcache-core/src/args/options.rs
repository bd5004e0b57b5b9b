//! Curated knowledge about compiler options.
//!
//! The analyzer consults these tables to decide, per token, whether the
//! option is safe to cache around, which derived command lines it belongs
//! to, and whether it consumes the next token or carries a path operand
//! worth normalizing.

const AFFECTS_CPP: u32 = 1 << 0;
const AFFECTS_COMP: u32 = 1 << 1;
const TOO_HARD: u32 = 1 << 2;
const TOO_HARD_DIRECT: u32 = 1 << 3;
const TAKES_ARG: u32 = 1 << 4;
const TAKES_CONCAT_ARG: u32 = 1 << 5;
const TAKES_PATH: u32 = 1 << 6;

struct OptInfo {
    name: &'static str,
    flags: u32,
}

const fn opt(name: &'static str, flags: u32) -> OptInfo {
    OptInfo { name, flags }
}

/// Sorted by name; looked up with binary search.
static OPTIONS: &[OptInfo] = &[
    opt("--ccache-skip", TAKES_ARG),
    opt("--param", TAKES_ARG),
    opt("--save-temps", TOO_HARD),
    opt("--serialize-diagnostics", TAKES_ARG | TAKES_PATH),
    opt("--specs", TAKES_ARG),
    opt("-A", TAKES_ARG),
    opt("-B", TAKES_ARG | TAKES_CONCAT_ARG | TAKES_PATH),
    opt("-D", AFFECTS_CPP | TAKES_ARG | TAKES_CONCAT_ARG),
    opt("-E", TOO_HARD),
    opt("-F", AFFECTS_CPP | TAKES_ARG | TAKES_CONCAT_ARG | TAKES_PATH),
    opt("-G", TAKES_ARG),
    opt("-I", AFFECTS_CPP | TAKES_ARG | TAKES_CONCAT_ARG | TAKES_PATH),
    opt("-L", TAKES_ARG),
    opt("-M", TOO_HARD),
    opt("-MF", AFFECTS_CPP | TAKES_ARG | TAKES_CONCAT_ARG | TAKES_PATH),
    opt("-MJ", TAKES_ARG | TOO_HARD),
    opt("-MM", TOO_HARD),
    opt("-MQ", AFFECTS_CPP | TAKES_ARG | TAKES_CONCAT_ARG | TAKES_PATH),
    opt("-MT", AFFECTS_CPP | TAKES_ARG | TAKES_CONCAT_ARG | TAKES_PATH),
    opt("-P", TOO_HARD),
    opt("-U", AFFECTS_CPP | TAKES_ARG | TAKES_CONCAT_ARG),
    opt("-V", TAKES_ARG),
    opt("-Wa,", AFFECTS_COMP | TAKES_CONCAT_ARG),
    opt("-Xassembler", AFFECTS_COMP | TAKES_ARG),
    opt("-Xclang", TAKES_ARG),
    opt("-Xlinker", TAKES_ARG),
    opt("-Xpreprocessor", AFFECTS_CPP | TOO_HARD_DIRECT | TAKES_ARG),
    opt("-arch", TAKES_ARG),
    opt("-aux-info", TAKES_ARG),
    opt("-b", TAKES_ARG),
    opt("-fmodules", TOO_HARD),
    opt("-fno-working-directory", AFFECTS_CPP),
    opt("-fplugin=libcc1plugin", TOO_HARD),
    opt("-frepo", TOO_HARD),
    opt("-ftime-trace", TOO_HARD),
    opt("-fworking-directory", AFFECTS_CPP),
    opt("-gtoggle", TOO_HARD),
    opt("-idirafter", AFFECTS_CPP | TAKES_ARG | TAKES_CONCAT_ARG | TAKES_PATH),
    opt("-iframework", AFFECTS_CPP | TAKES_ARG | TAKES_CONCAT_ARG | TAKES_PATH),
    opt("-imacros", AFFECTS_CPP | TAKES_ARG | TAKES_CONCAT_ARG | TAKES_PATH),
    opt("-imultilib", AFFECTS_CPP | TAKES_ARG | TAKES_CONCAT_ARG | TAKES_PATH),
    opt("-include", AFFECTS_CPP | TAKES_ARG | TAKES_CONCAT_ARG | TAKES_PATH),
    opt("-include-pch", AFFECTS_CPP | TAKES_ARG | TAKES_CONCAT_ARG | TAKES_PATH),
    opt("-include-pth", AFFECTS_CPP | TAKES_ARG | TAKES_CONCAT_ARG | TAKES_PATH),
    opt("-install_name", TAKES_ARG),
    opt("-iprefix", AFFECTS_CPP | TAKES_ARG | TAKES_CONCAT_ARG | TAKES_PATH),
    opt("-iquote", AFFECTS_CPP | TAKES_ARG | TAKES_CONCAT_ARG | TAKES_PATH),
    opt("-isysroot", AFFECTS_CPP | TAKES_ARG | TAKES_CONCAT_ARG | TAKES_PATH),
    opt("-isystem", AFFECTS_CPP | TAKES_ARG | TAKES_CONCAT_ARG | TAKES_PATH),
    opt("-iwithprefix", AFFECTS_CPP | TAKES_ARG | TAKES_CONCAT_ARG | TAKES_PATH),
    opt(
        "-iwithprefixbefore",
        AFFECTS_CPP | TAKES_ARG | TAKES_CONCAT_ARG | TAKES_PATH,
    ),
    opt("-ldir", TAKES_ARG),
    opt("-nostdinc", AFFECTS_CPP),
    opt("-nostdinc++", AFFECTS_CPP),
    opt("-remap", AFFECTS_CPP),
    opt("-save-temps", TOO_HARD),
    opt("-specs", TAKES_ARG),
    opt("-stdlib=", AFFECTS_CPP | TAKES_CONCAT_ARG),
    opt("-trigraphs", AFFECTS_CPP),
    opt("-u", TAKES_ARG | TAKES_CONCAT_ARG),
];

fn lookup(option: &str) -> Option<&'static OptInfo> {
    OPTIONS
        .binary_search_by(|probe| probe.name.cmp(option))
        .ok()
        .map(|idx| &OPTIONS[idx])
}

fn has(option: &str, flag: u32) -> bool {
    lookup(option).is_some_and(|info| info.flags & flag != 0)
}

/// Flag test against the longest table entry that is a prefix of `arg` and
/// takes a concatenated operand, e.g. `-I/usr/include` matches `-I`.
fn prefix_has(arg: &str, flag: u32) -> bool {
    OPTIONS.iter().any(|info| {
        info.flags & TAKES_CONCAT_ARG != 0
            && info.flags & flag != 0
            && arg.len() > info.name.len()
            && arg.starts_with(info.name)
    })
}

#[must_use]
pub fn too_hard(option: &str) -> bool {
    has(option, TOO_HARD)
}

#[must_use]
pub fn too_hard_for_direct(option: &str) -> bool {
    has(option, TOO_HARD_DIRECT)
}

#[must_use]
pub fn takes_arg(option: &str) -> bool {
    has(option, TAKES_ARG)
}

#[must_use]
pub fn takes_concat_arg(option: &str) -> bool {
    has(option, TAKES_CONCAT_ARG)
}

#[must_use]
pub fn takes_path(option: &str) -> bool {
    has(option, TAKES_PATH)
}

#[must_use]
pub fn affects_cpp(option: &str) -> bool {
    has(option, AFFECTS_CPP)
}

#[must_use]
pub fn affects_comp(option: &str) -> bool {
    has(option, AFFECTS_COMP)
}

#[must_use]
pub fn prefix_affects_cpp(arg: &str) -> bool {
    prefix_has(arg, AFFECTS_CPP)
}

#[must_use]
pub fn prefix_affects_comp(arg: &str) -> bool {
    prefix_has(arg, AFFECTS_COMP)
}
