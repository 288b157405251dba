use itertools::Itertools;
use prettytable::{cell, row, Row};

use crate::announce::Announcement;
use crate::config::SessionSettings;
use crate::rib::RouteRecord;
use crate::utils::{asn_to_dotted, format_time_as_elapsed, EMPTY_VALUE};

use super::table::ToRow;

fn path_or_empty(path: &[u32]) -> String {
    if path.is_empty() {
        String::from(EMPTY_VALUE)
    } else {
        path.iter().map(|asn| asn_to_dotted(*asn)).join(" ")
    }
}

impl ToRow for SessionSettings {
    fn columns() -> Row {
        row!["Neighbor", "AS", "Local AS", "Type", "MD5", "Add-Path", "Full Table"]
    }

    fn to_row(&self) -> Row {
        row![
            self.peer_ip,
            asn_to_dotted(self.peer_asn),
            asn_to_dotted(self.local_asn),
            if self.is_ebgp() { "eBGP" } else { "iBGP" },
            if self.md5_password.is_some() { "yes" } else { "no" },
            self.add_path,
            self.full_table,
        ]
    }
}

impl ToRow for Announcement {
    fn columns() -> Row {
        row!["Prefix", "Next Hop", "Origin", "AS Path", "Communities"]
    }

    fn to_row(&self) -> Row {
        row![
            self.prefix,
            self.next_hop,
            self.origin,
            path_or_empty(&self.as_path),
            &self.communities,
        ]
    }
}

impl ToRow for RouteRecord {
    fn columns() -> Row {
        row![
            "Id",
            "Prefix",
            "Next Hop",
            "Age",
            "Origin",
            "AS Path",
            "Communities",
            "RPKI",
            "IRR"
        ]
    }

    fn to_row(&self) -> Row {
        row![
            self.id,
            self.prefix,
            self.nexthop,
            format_time_as_elapsed(self.received_at),
            self.origin,
            path_or_empty(&self.path),
            &self.communities,
            self.rpki_status,
            if self.irr_valid { "valid" } else { EMPTY_VALUE },
        ]
    }
}
