use std::fs;

pub fn cpu_probe() -> u8 {
    #[cfg(target_arch = "x86_64")]
    {
        let leaf = unsafe { std::arch::x86_64::__cpuid(0) };
        fold_cpuid(&[leaf.eax, leaf.ebx, leaf.ecx, leaf.edx])
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        // No cpuid on this architecture; derive from the arch name instead.
        super::fold_bytes(std::env::consts::ARCH.as_bytes())
    }
}

#[cfg(target_arch = "x86_64")]
fn fold_cpuid(regs: &[u32; 4]) -> u8 {
    let mut hash: u16 = 0;
    for reg in regs {
        hash = hash.wrapping_add(*reg as u16);
        hash = hash.wrapping_add((*reg >> 16) as u16);
    }
    (hash & 0xFF) as u8
}

pub fn volume_probe(machine_name: &str) -> u8 {
    super::fold_bytes(machine_name.as_bytes())
}

/// Enumerate Ethernet-class interfaces via sysfs, loopback excluded.
pub fn mac_addresses() -> Vec<[u8; 6]> {
    let mut names: Vec<String> = match fs::read_dir("/sys/class/net") {
        Ok(entries) => entries
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => return Vec::new(),
    };
    // read_dir order is arbitrary
    names.sort();

    let mut macs = Vec::new();
    for name in names {
        if name == "lo" {
            continue;
        }
        // type 1 is ARPHRD_ETHER
        let is_ether = fs::read_to_string(format!("/sys/class/net/{name}/type"))
            .map(|t| t.trim() == "1")
            .unwrap_or(false);
        if !is_ether {
            continue;
        }
        if let Ok(addr) = fs::read_to_string(format!("/sys/class/net/{name}/address")) {
            if let Some(mac) = super::parse_mac(&addr) {
                macs.push(mac);
            }
        }
    }
    macs
}
