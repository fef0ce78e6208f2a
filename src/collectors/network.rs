//! Addresses, routes, firewall state and per-interface NIC details.

use std::fs;

use crate::collectors::context::Collection;
use crate::constants::NET_CLASS_DIR;
use crate::error::ArchiveError;
use crate::utils::collection_log::LogSink;
use crate::utils::pipeline::{CommandSpec, Pipeline};

/// `ip` objects captured as JSON with a text fallback.
const IP_OBJECTS: &[(&str, &str)] = &[
    ("addr", "addr show"),
    ("link", "-s link show"),
    ("route", "route show table all"),
    ("route6", "-6 route show table all"),
    ("neigh", "neigh show"),
    ("rule", "rule show"),
];

/// `ethtool` queries, as (entry stem, flag, supports --json).
const ETHTOOL_QUERIES: &[(&str, &str, bool)] = &[
    ("ethtool", "", false),
    ("ethtool-driver", "-i", false),
    ("ethtool-coalesce", "-c", true),
    ("ethtool-features", "-k", true),
    ("ethtool-rings", "-g", true),
    ("ethtool-stats", "-S", false),
];

pub fn collect(c: &mut Collection<'_>) -> Result<(), ArchiveError> {
    for (stem, args) in IP_OBJECTS {
        c.json_or_text(
            &format!("net/ip-{}.json", stem),
            Pipeline::cmd(&format!("ip -j {}", args)),
            &format!("net/ip-{}.txt", stem),
            Pipeline::cmd(&format!("ip {}", args)),
        )?;
    }

    for iface in interfaces(c) {
        collect_interface(c, &iface)?;
    }

    c.command("net/iptables-save.txt", Pipeline::cmd("iptables-save"), false)?;
    c.command("net/ip6tables-save.txt", Pipeline::cmd("ip6tables-save"), false)?;
    c.json_or_text(
        "net/nft-ruleset.json",
        Pipeline::cmd("nft -j list ruleset"),
        "net/nft-ruleset.txt",
        Pipeline::cmd("nft list ruleset"),
    )?;
    c.command("net/ss.txt", Pipeline::cmd("ss -tunapie"), false)?;

    c.copy_host_file("net/resolv.conf", "etc/resolv.conf")?;
    c.copy_host_file("net/hosts", "etc/hosts")?;
    c.copy_host_file("net/proc-net-dev", "proc/net/dev")?;
    c.copy_host_file("net/proc-net-snmp", "proc/net/snmp")?;
    Ok(())
}

/// Interface names from sysfs, sorted.
fn interfaces(c: &mut Collection<'_>) -> Vec<String> {
    let dir = c.host_path(NET_CLASS_DIR);
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) => {
            let name = c.entry_name("net");
            c.log().fail(None, format!("{}: cannot list interfaces in {}: {}", name, dir.display(), e));
            return Vec::new();
        }
    };

    // interfaces are symlinks into the device tree; plain files such as
    // bonding_masters are control knobs
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_type()
                .map(|kind| kind.is_symlink() || kind.is_dir())
                .unwrap_or(false)
        })
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn collect_interface(c: &mut Collection<'_>, iface: &str) -> Result<(), ArchiveError> {
    for (stem, flag, json) in ETHTOOL_QUERIES {
        let mut args: Vec<&str> = Vec::new();
        if !flag.is_empty() {
            args.push(*flag);
        }
        args.push(iface);
        let text = Pipeline::new(CommandSpec::new("ethtool", args.iter().copied()));
        let text_relative = format!("net/{}/{}.txt", iface, stem);

        if *json {
            let json_args = std::iter::once("--json").chain(args.iter().copied());
            c.json_or_text(
                &format!("net/{}/{}.json", iface, stem),
                Pipeline::new(CommandSpec::new("ethtool", json_args)),
                &text_relative,
                text,
            )?;
        } else {
            c.command(&text_relative, text, false)?;
        }
    }
    Ok(())
}
