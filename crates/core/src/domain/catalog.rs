use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const SERVICES_SEPARATOR: &str = ", ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Service {
    #[serde(rename = "Potong Rambut")]
    PotongRambut,
    #[serde(rename = "Cukur Jenggot")]
    CukurJenggot,
    #[serde(rename = "Hair Spa")]
    HairSpa,
    #[serde(rename = "Cat Rambut")]
    CatRambut,
    #[serde(rename = "Creambath")]
    Creambath,
    #[serde(rename = "Paket Lengkap")]
    PaketLengkap,
}

impl Service {
    pub const ALL: [Service; 6] = [
        Service::PotongRambut,
        Service::CukurJenggot,
        Service::HairSpa,
        Service::CatRambut,
        Service::Creambath,
        Service::PaketLengkap,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Service::PotongRambut => "Potong Rambut",
            Service::CukurJenggot => "Cukur Jenggot",
            Service::HairSpa => "Hair Spa",
            Service::CatRambut => "Cat Rambut",
            Service::Creambath => "Creambath",
            Service::PaketLengkap => "Paket Lengkap",
        }
    }

    pub fn price(self) -> u64 {
        match self {
            Service::PotongRambut => 20_000,
            Service::CukurJenggot => 15_000,
            Service::HairSpa => 30_000,
            Service::CatRambut => 40_000,
            Service::Creambath => 25_000,
            Service::PaketLengkap => 80_000,
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown service {0:?}")]
pub struct UnknownService(pub String);

impl FromStr for Service {
    type Err = UnknownService;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Service::ALL
            .into_iter()
            .find(|svc| svc.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownService(wanted.to_string()))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub service: Service,
    pub price: u64,
}

pub fn catalog() -> Vec<CatalogEntry> {
    Service::ALL
        .into_iter()
        .map(|service| CatalogEntry {
            service,
            price: service.price(),
        })
        .collect()
}

pub fn total_price(services: &[Service]) -> u64 {
    services.iter().map(|s| s.price()).sum()
}

pub fn services_label(services: &[Service]) -> String {
    services
        .iter()
        .map(|s| s.label())
        .collect::<Vec<_>>()
        .join(SERVICES_SEPARATOR)
}
