//! Closed lookup vocabularies

use serde::{Deserialize, Serialize};

/// Order lifecycle status after normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Created,
    Approved,
    Shipped,
    Delivered,
    Canceled,
    /// Anything the source vocabulary does not define
    Invalid,
}

impl OrderStatus {
    /// Map a free-form source status into the closed vocabulary
    pub fn from_raw(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::Invalid;
        };
        match raw.trim().to_lowercase().as_str() {
            "delivered" => Self::Delivered,
            "shipped" => Self::Shipped,
            "canceled" | "unavailable" => Self::Canceled,
            "invoiced" | "approved" => Self::Approved,
            "processing" | "created" => Self::Created,
            _ => Self::Invalid,
        }
    }

    /// Get the status name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Approved => "approved",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Canceled => "canceled",
            Self::Invalid => "invalid",
        }
    }

    /// 1 for a recognised status, 0 for `invalid`
    pub fn validity_flag(&self) -> u8 {
        if *self == Self::Invalid { 0 } else { 1 }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The 27 Brazilian federative units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrazilianState {
    AC,
    AL,
    AP,
    AM,
    BA,
    CE,
    DF,
    ES,
    GO,
    MA,
    MT,
    MS,
    MG,
    PA,
    PB,
    PR,
    PE,
    PI,
    RJ,
    RN,
    RS,
    RO,
    RR,
    SC,
    SP,
    SE,
    TO,
}

impl BrazilianState {
    /// Every unit, in code order of the lookup table
    pub const ALL: [BrazilianState; 27] = [
        Self::AC,
        Self::AL,
        Self::AP,
        Self::AM,
        Self::BA,
        Self::CE,
        Self::DF,
        Self::ES,
        Self::GO,
        Self::MA,
        Self::MT,
        Self::MS,
        Self::MG,
        Self::PA,
        Self::PB,
        Self::PR,
        Self::PE,
        Self::PI,
        Self::RJ,
        Self::RN,
        Self::RS,
        Self::RO,
        Self::RR,
        Self::SC,
        Self::SP,
        Self::SE,
        Self::TO,
    ];

    /// Look up a two-letter code (exact, upper-case)
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|state| state.code() == code)
    }

    /// Two-letter code
    pub fn code(&self) -> &'static str {
        match self {
            Self::AC => "AC",
            Self::AL => "AL",
            Self::AP => "AP",
            Self::AM => "AM",
            Self::BA => "BA",
            Self::CE => "CE",
            Self::DF => "DF",
            Self::ES => "ES",
            Self::GO => "GO",
            Self::MA => "MA",
            Self::MT => "MT",
            Self::MS => "MS",
            Self::MG => "MG",
            Self::PA => "PA",
            Self::PB => "PB",
            Self::PR => "PR",
            Self::PE => "PE",
            Self::PI => "PI",
            Self::RJ => "RJ",
            Self::RN => "RN",
            Self::RS => "RS",
            Self::RO => "RO",
            Self::RR => "RR",
            Self::SC => "SC",
            Self::SP => "SP",
            Self::SE => "SE",
            Self::TO => "TO",
        }
    }

    /// Full state name
    pub fn full_name(&self) -> &'static str {
        match self {
            Self::AC => "Acre",
            Self::AL => "Alagoas",
            Self::AP => "Amapá",
            Self::AM => "Amazonas",
            Self::BA => "Bahia",
            Self::CE => "Ceará",
            Self::DF => "Distrito Federal (Brasília)",
            Self::ES => "Espírito Santo",
            Self::GO => "Goiás",
            Self::MA => "Maranhão",
            Self::MT => "Mato Grosso",
            Self::MS => "Mato Grosso do Sul",
            Self::MG => "Minas Gerais",
            Self::PA => "Pará",
            Self::PB => "Paraíba",
            Self::PR => "Paraná",
            Self::PE => "Pernambuco",
            Self::PI => "Piauí",
            Self::RJ => "Rio de Janeiro",
            Self::RN => "Rio Grande do Norte",
            Self::RS => "Rio Grande do Sul",
            Self::RO => "Rondônia",
            Self::RR => "Roraima",
            Self::SC => "Santa Catarina",
            Self::SP => "São Paulo",
            Self::SE => "Sergipe",
            Self::TO => "Tocantins",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_status_mapping() {
        assert_eq!(OrderStatus::from_raw(Some("invoiced")), OrderStatus::Approved);
        assert_eq!(OrderStatus::from_raw(Some("processing")), OrderStatus::Created);
        assert_eq!(OrderStatus::from_raw(Some("unavailable")), OrderStatus::Canceled);
        assert_eq!(OrderStatus::from_raw(Some(" Delivered ")), OrderStatus::Delivered);
        assert_eq!(OrderStatus::from_raw(Some("bogus")), OrderStatus::Invalid);
        assert_eq!(OrderStatus::from_raw(None), OrderStatus::Invalid);
    }

    #[test]
    fn test_validity_flag() {
        assert_eq!(OrderStatus::Invalid.validity_flag(), 0);
        assert_eq!(OrderStatus::Shipped.validity_flag(), 1);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&OrderStatus::Canceled).unwrap();
        assert_eq!(json, "\"canceled\"");
    }

    #[test]
    fn test_state_table_is_complete() {
        let codes: HashSet<_> = BrazilianState::ALL.iter().map(|s| s.code()).collect();
        assert_eq!(codes.len(), 27);
        for state in BrazilianState::ALL {
            assert_eq!(BrazilianState::from_code(state.code()), Some(state));
        }
    }

    #[test]
    fn test_state_names() {
        assert_eq!(BrazilianState::from_code("SP").unwrap().full_name(), "São Paulo");
        assert_eq!(
            BrazilianState::from_code("DF").unwrap().full_name(),
            "Distrito Federal (Brasília)"
        );
        assert_eq!(BrazilianState::from_code("XX"), None);
        assert_eq!(BrazilianState::from_code("sp"), None);
    }
}
