//! Closed sets of values shared by the API and the database. Each enum
//! (de)serializes to the exact string stored in SQLite.

macro_rules! string_enum {
    ($(#[$meta:meta])* pub enum $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(format!(
                        "'{}' is not a valid {}; expected one of {}",
                        s,
                        stringify!($name),
                        [$($text),+].join(", ")
                    )),
                }
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }

        impl rusqlite::ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
                Ok(rusqlite::types::ToSqlOutput::from(self.as_str()))
            }
        }

        impl rusqlite::types::FromSql for $name {
            fn column_result(value: rusqlite::types::ValueRef<'_>) -> rusqlite::types::FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: String| rusqlite::types::FromSqlError::Other(e.into()))
            }
        }
    };
}

string_enum! {
    pub enum Role {
        User => "USER",
        Company => "COMPANY",
        Support => "SUPPORT",
        Admin => "ADMIN",
        SuperAdmin => "SUPER_ADMIN",
    }
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }
}

string_enum! {
    /// Indian state a user, document, ticket or college belongs to.
    pub enum Region {
        AndhraPradesh => "AP",
        Telangana => "TS",
    }
}

string_enum! {
    pub enum Tier {
        Free => "FREE",
        OneRupee => "1_RUPEE",
        NineRupee => "9_RUPEE",
    }
}

impl Tier {
    /// Tier bought by a captured payment of `rupees`, if any.
    pub fn for_amount(rupees: f64) -> Option<Tier> {
        if rupees >= 9.0 {
            Some(Tier::NineRupee)
        } else if rupees >= 1.0 {
            Some(Tier::OneRupee)
        } else {
            None
        }
    }
}

string_enum! {
    pub enum Qualification {
        Tenth => "10th",
        Twelfth => "12th",
        Diploma => "Diploma",
        BTech => "B.Tech",
        BSc => "B.Sc",
        BCom => "B.Com",
        BA => "B.A",
        Mba => "MBA",
        MTech => "M.Tech",
    }
}

string_enum! {
    pub enum StudentStatus {
        Active => "Active",
        Inactive => "Inactive",
    }
}

string_enum! {
    pub enum DocType {
        HallTicket => "HALL_TICKET",
        Result => "RESULT",
        Roadmap => "ROADMAP",
    }
}

string_enum! {
    pub enum DocStatus {
        Pending => "PENDING",
        Approved => "APPROVED",
        Rejected => "REJECTED",
    }
}

string_enum! {
    pub enum TicketStatus {
        Open => "OPEN",
        InProgress => "IN_PROGRESS",
        Completed => "COMPLETED",
    }
}

string_enum! {
    pub enum ConversationType {
        UserSupport => "USER_SUPPORT",
        SupportAdmin => "SUPPORT_ADMIN",
        AdminSuperAdmin => "ADMIN_SUPER_ADMIN",
    }
}

string_enum! {
    pub enum VerificationStatus {
        Pending => "pending",
        Verified => "verified",
        Rejected => "rejected",
    }
}

impl VerificationStatus {
    /// Accepts `PENDING`, `Verified`, `rejected`, ...
    pub fn parse_insensitive(raw: &str) -> Option<VerificationStatus> {
        raw.trim().to_ascii_lowercase().parse().ok()
    }
}

string_enum! {
    pub enum JobCategory {
        Government => "Government",
        Private => "Private",
    }
}

string_enum! {
    pub enum JobType {
        FullTime => "Full-time",
        PartTime => "Part-time",
        Contract => "Contract",
        Intern => "Intern",
    }
}

string_enum! {
    pub enum JobStatus {
        Draft => "Draft",
        Active => "Active",
        Closed => "Closed",
        Expired => "Expired",
    }
}

string_enum! {
    pub enum ApplicationStatus {
        Applied => "APPLIED",
        Shortlisted => "SHORTLISTED",
        InterviewScheduled => "INTERVIEW_SCHEDULED",
        Accepted => "ACCEPTED",
        Rejected => "REJECTED",
    }
}

string_enum! {
    /// Reservation category used by the college predictor.
    pub enum RankCategory {
        Oc => "OC",
        Bc => "BC",
        Sc => "SC",
        St => "ST",
    }
}

impl RankCategory {
    /// Column holding the cutoff rank for this category.
    pub fn cutoff_column(&self) -> &'static str {
        match self {
            RankCategory::Oc => "cutoff_oc",
            RankCategory::Bc => "cutoff_bc",
            RankCategory::Sc => "cutoff_sc",
            RankCategory::St => "cutoff_st",
        }
    }
}

string_enum! {
    pub enum ActivityAction {
        Login => "LOGIN",
        Register => "REGISTER",
        DocumentUpload => "DOCUMENT_UPLOAD",
        DocumentApprove => "DOCUMENT_APPROVE",
        DocumentReject => "DOCUMENT_REJECT",
        DocumentView => "DOCUMENT_VIEW",
        TicketCreate => "TICKET_CREATE",
        TicketAssign => "TICKET_ASSIGN",
        TicketComplete => "TICKET_COMPLETE",
        CollegePredict => "COLLEGE_PREDICT",
        PaymentVerify => "PAYMENT_VERIFY",
        ProfileUpdate => "PROFILE_UPDATE",
        CompanyVerify => "COMPANY_VERIFY",
        JobCreate => "JOB_CREATE",
        JobApply => "JOB_APPLY",
        ApplicationReview => "APPLICATION_REVIEW",
        Follow => "FOLLOW",
        Unfollow => "UNFOLLOW",
        PostCreate => "POST_CREATE",
        PostUpdate => "POST_UPDATE",
        PostDelete => "POST_DELETE",
        PostLike => "POST_LIKE",
        PostUnlike => "POST_UNLIKE",
        PostSave => "POST_SAVE",
        PostUnsave => "POST_UNSAVE",
        PostComment => "POST_COMMENT",
        PostShare => "POST_SHARE",
    }
}

string_enum! {
    pub enum ResourceType {
        Document => "DOCUMENT",
        Ticket => "TICKET",
        User => "USER",
        Payment => "PAYMENT",
        Auth => "AUTH",
        Predictor => "PREDICTOR",
        Company => "COMPANY",
        Job => "JOB",
        Post => "POST",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let json = serde_json::to_string(&Role::SuperAdmin).unwrap();
        assert_eq!(json, "\"SUPER_ADMIN\"");
        let back: Role = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Role::SuperAdmin);
    }

    #[test]
    fn rejects_unknown_values_with_the_allowed_list() {
        let err = "B.Arch".parse::<Qualification>().unwrap_err();
        assert!(err.contains("B.Tech"));
        assert!(serde_json::from_str::<Region>("\"KA\"").is_err());
    }

    #[test]
    fn verification_status_parses_any_case() {
        assert_eq!(
            VerificationStatus::parse_insensitive("VERIFIED"),
            Some(VerificationStatus::Verified)
        );
        assert_eq!(VerificationStatus::parse_insensitive("nope"), None);
    }

    #[test]
    fn tier_thresholds() {
        assert_eq!(Tier::for_amount(9.0), Some(Tier::NineRupee));
        assert_eq!(Tier::for_amount(49.0), Some(Tier::NineRupee));
        assert_eq!(Tier::for_amount(1.0), Some(Tier::OneRupee));
        assert_eq!(Tier::for_amount(8.99), Some(Tier::OneRupee));
        assert_eq!(Tier::for_amount(0.5), None);
    }
}
