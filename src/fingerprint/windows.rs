use std::process::Command;

pub fn cpu_probe() -> u8 {
    #[cfg(target_arch = "x86_64")]
    {
        let leaf = unsafe { std::arch::x86_64::__cpuid(0) };
        fold_cpuid(&[leaf.eax, leaf.ebx, leaf.ecx, leaf.edx])
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
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

/// Boot-volume serial number, reduced to eight bits.
pub fn volume_probe() -> u8 {
    let serial = boot_volume_serial().unwrap_or(0);
    ((serial.wrapping_add(serial >> 8)) & 0xFF) as u8
}

fn boot_volume_serial() -> Option<u32> {
    // `vol C:` prints "Volume Serial Number is XXXX-XXXX"
    let output = Command::new("cmd").args(["/C", "vol", "C:"]).output().ok()?;
    let text = String::from_utf8_lossy(&output.stdout);
    let hex = text
        .lines()
        .find_map(|line| line.rsplit_once(" is ").map(|(_, serial)| serial))?
        .trim()
        .replace('-', "");
    u32::from_str_radix(&hex, 16).ok()
}

/// Enumerate adapter MAC addresses via `getmac`.
pub fn mac_addresses() -> Vec<[u8; 6]> {
    let output = match Command::new("getmac").args(["/NH", "/FO", "CSV"]).output() {
        Ok(o) => o,
        Err(_) => return Vec::new(),
    };
    let text = String::from_utf8_lossy(&output.stdout);
    text.lines()
        .filter_map(|line| {
            let field = line.split(',').next()?.trim().trim_matches('"');
            super::parse_mac(field)
        })
        .collect()
}
