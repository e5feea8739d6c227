//! Where the main service configuration lives on a given platform.

use std::path::PathBuf;

use varnishlog_core::{LogFormat, PlatformContext, TemplatePlan, TemplateVariant};

/// Resolve the destination and template flavour for `format` on `platform`.
///
/// Debian-family hosts always use `/etc/default`, whatever their init system.
/// Other systemd hosts get a `.params` file next to the unit; everything else
/// falls back to `/etc/sysconfig`.
pub fn select(platform: &PlatformContext, format: LogFormat) -> TemplatePlan {
    let name = format.as_str();
    if platform.is_debian_family() {
        TemplatePlan {
            destination_path: PathBuf::from("/etc/default").join(name),
            variant: TemplateVariant::Default,
        }
    } else if platform.is_systemd() {
        TemplatePlan {
            destination_path: PathBuf::from("/etc/systemd/system").join(format!("{name}.params")),
            variant: TemplateVariant::Systemd,
        }
    } else {
        TemplatePlan {
            destination_path: PathBuf::from("/etc/sysconfig").join(name),
            variant: TemplateVariant::Default,
        }
    }
}
