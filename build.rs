use std::env;

struct Context {
    target_os: String,
    force_unsupported: bool,
}
impl Context {
    fn new() -> Self {
        Self {
            target_os: env::var("CARGO_CFG_TARGET_OS").unwrap_or_default(),
            force_unsupported: env::var_os("CARGO_FEATURE_FORCE_UNSUPPORTED").is_some(),
        }
    }
}

fn has_epoll_eventfd(cx: &Context) -> bool {
    println!("cargo::rustc-check-cfg=cfg(has_epoll_eventfd)");
    if cx.force_unsupported {
        return false;
    }
    // Android ships the same syscalls as mainline linux, only the header paths differ
    if ["linux", "android"].contains(&cx.target_os.as_str()) {
        println!("cargo::rustc-cfg=has_epoll_eventfd");
        true
    } else {
        false
    }
}

fn autocfg() {
    let cx = Context::new();
    has_epoll_eventfd(&cx);
}

fn main() {
    println!("cargo::rerun-if-changed=build.rs");
    autocfg();
}
