use clap::{Subcommand, ValueEnum};

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Save server credentials after checking them
    Login {
        /// Server URL (e.g. "crm.example.com")
        #[arg(long)]
        server: Option<String>,

        /// API token
        #[arg(long)]
        token: Option<String>,

        /// Skip interactive prompts (requires --server and --token)
        #[arg(long)]
        non_interactive: bool,
    },

    /// Remove saved credentials
    Logout,
}

#[derive(Subcommand)]
pub enum LeadCommands {
    /// Show a lead with its recent timeline
    Show {
        lead_id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Move a lead to another pipeline stage
    Stage {
        lead_id: String,

        /// Target stage name. Prompts when omitted.
        stage: Option<String>,

        /// Lost reason, or optional note for other terminal stages
        #[arg(long)]
        note: Option<String>,

        /// Proceed through an ownership warning without asking
        #[arg(long)]
        confirm: bool,

        /// Skip interactive prompts (requires a stage)
        #[arg(long)]
        non_interactive: bool,
    },

    /// Add a note, optionally as a reply
    Note {
        lead_id: String,

        /// Note text
        content: String,

        /// Activity id of the note being replied to
        #[arg(long)]
        reply_to: Option<String>,

        /// User ids to mention
        #[arg(long = "mention")]
        mentions: Vec<String>,

        /// Proceed through an ownership warning without asking
        #[arg(long)]
        confirm: bool,
    },

    /// Log a phone call
    Call {
        lead_id: String,

        #[arg(long, value_enum, default_value = "outbound")]
        direction: DirectionArg,

        /// Free-form call outcome (e.g. "left voicemail")
        #[arg(long)]
        outcome: Option<String>,

        /// Call length in seconds
        #[arg(long)]
        duration: Option<u32>,

        #[arg(long)]
        notes: Option<String>,

        /// Proceed through an ownership warning without asking
        #[arg(long)]
        confirm: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum DirectionArg {
    Inbound,
    Outbound,
}

#[derive(Subcommand)]
pub enum ScheduleCommands {
    /// Today's and upcoming appointments and follow-ups
    Show {
        lead_id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change an appointment's status or time
    Appointment {
        lead_id: String,
        appointment_id: String,

        /// New status (scheduled, confirmed, arrived, in_showroom, in_progress,
        /// completed, no_show, cancelled, rescheduled)
        #[arg(long, conflicts_with = "reschedule")]
        status: Option<String>,

        /// New start time (RFC 3339); marks the appointment rescheduled
        #[arg(long)]
        reschedule: Option<String>,
    },

    /// Mark a follow-up completed
    FollowUp {
        lead_id: String,
        follow_up_id: String,
    },
}

#[derive(Subcommand)]
pub enum ShowroomCommands {
    /// Show whether the lead is currently checked in
    Status { lead_id: String },

    /// Check the lead in to the showroom
    CheckIn {
        lead_id: String,

        /// Link the visit to this appointment
        #[arg(long, conflicts_with = "no_appointment")]
        appointment: Option<String>,

        /// Check in without linking an appointment
        #[arg(long)]
        no_appointment: bool,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,
    },

    /// Close the lead's open visit
    CheckOut {
        lead_id: String,

        /// sold, follow_up, reschedule, not_interested, browsing, couldnt_qualify
        #[arg(long)]
        outcome: String,

        #[arg(long)]
        notes: Option<String>,

        /// New appointment time (RFC 3339) when the outcome is reschedule
        #[arg(long)]
        reschedule_at: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum DocsCommands {
    /// List a lead's documents
    List {
        lead_id: String,

        /// Only documents in this category id
        #[arg(long)]
        category: Option<String>,
    },

    /// Delete a document
    Delete {
        lead_id: String,
        document_id: String,

        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum FormatArg {
    /// Zip of documents, timeline and notes
    Archive,
    /// Paginated PDF summary with document links
    Document,
}
