use std::process::Command;

fn sysctl_int(key: &str) -> Option<i64> {
    let output = Command::new("sysctl").args(["-n", key]).output().ok()?;
    String::from_utf8_lossy(&output.stdout).trim().parse().ok()
}

pub fn cpu_probe() -> u8 {
    let cputype = sysctl_int("hw.cputype").unwrap_or(0);
    let cpusubtype = sysctl_int("hw.cpusubtype").unwrap_or(0);
    (cputype as u8).wrapping_add(cpusubtype as u8)
}

pub fn volume_probe(machine_name: &str) -> u8 {
    super::fold_bytes(machine_name.as_bytes())
}

/// Enumerate hardware interfaces by scraping `ifconfig` for `ether` lines.
pub fn mac_addresses() -> Vec<[u8; 6]> {
    let output = match Command::new("ifconfig").arg("-a").output() {
        Ok(o) => o,
        Err(_) => return Vec::new(),
    };
    let text = String::from_utf8_lossy(&output.stdout);
    text.lines()
        .filter_map(|line| {
            let line = line.trim_start();
            line.strip_prefix("ether ")
                .and_then(|rest| super::parse_mac(rest.split_whitespace().next()?))
        })
        .collect()
}
