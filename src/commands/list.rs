//! List command implementation

use blackbox_core::chip;

/// List all supported chips
pub fn list_chips(vendor_filter: Option<&str>) {
    println!("Supported flash chips:");
    println!();
    println!(
        "{:<12} {:<14} {:>8} {:>10} {:>8} {:>10}",
        "Vendor", "Name", "Size", "JEDEC ID", "Sectors", "Clock MHz"
    );
    println!("{}", "-".repeat(67));

    for chip in chip::CHIPS {
        if let Some(vendor) = vendor_filter {
            if !chip.vendor.to_lowercase().contains(&vendor.to_lowercase()) {
                continue;
            }
        }

        let geometry = chip.geometry();
        let jedec_str = format!("{:02X} {:04X}", chip.manufacturer(), chip.device());
        let clock_str = format!("{}/{}", chip.max_program_clock_mhz, chip.max_read_clock_mhz);

        println!(
            "{:<12} {:<14} {:>8} {:>10} {:>8} {:>10}",
            chip.vendor,
            chip.name,
            format_size(chip.size()),
            jedec_str,
            geometry.sector_count,
            clock_str
        );
        if chip.exceeds_address_range() {
            println!("{:<27} only the first {} are used", "", format_size(geometry.total_size));
        }
    }
}

fn format_size(bytes: u32) -> String {
    if bytes >= 1024 * 1024 {
        format!("{} MiB", bytes / (1024 * 1024))
    } else if bytes >= 1024 {
        format!("{} KiB", bytes / 1024)
    } else {
        format!("{} B", bytes)
    }
}
