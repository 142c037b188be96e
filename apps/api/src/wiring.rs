use std::sync::Arc;

use tracing::{info, warn};

use appointment_cell::handlers::AppointmentState;
use appointment_cell::{
    AppointmentPolicyConfig, AppointmentService, ExpirySweeper, LogNotifier, MemoryReservationStore,
    Notifier, ReservationStore, SupabaseReservationStore, WebhookNotifier,
};
use doctor_cell::{DoctorDirectory, DoctorService, MemoryDoctorDirectory, SupabaseDoctorDirectory};
use shared_config::{AppConfig, StorageBackend};
use shared_database::SupabaseClient;
use video_conferencing_cell::{UnmanagedRooms, VideoRoomClient, VideoRoomProvider};
use wallet_cell::handlers::WalletState;
use wallet_cell::{LedgerService, MemoryWalletStore, PaymentGatewayClient, SupabaseWalletStore, WalletStore};

/// Everything the router and the background sweeper share.
pub struct Cells {
    pub config: Arc<AppConfig>,
    pub wallet: Arc<WalletState>,
    pub appointments: Arc<AppointmentState>,
    pub sweeper: Arc<ExpirySweeper>,
}

struct Stores {
    wallets: Arc<dyn WalletStore>,
    reservations: Arc<dyn ReservationStore>,
    doctors: Arc<dyn DoctorDirectory>,
}

impl Stores {
    fn for_backend(config: &AppConfig) -> Self {
        match config.storage_backend {
            StorageBackend::Supabase => {
                info!("Using Supabase storage at {}", config.supabase_url);
                let supabase = Arc::new(SupabaseClient::new(config));
                Self {
                    wallets: Arc::new(SupabaseWalletStore::new(supabase.clone())),
                    reservations: Arc::new(SupabaseReservationStore::new(supabase.clone())),
                    doctors: Arc::new(SupabaseDoctorDirectory::new(supabase)),
                }
            }
            StorageBackend::Memory => {
                warn!("Using in-memory storage; data is lost on restart");
                Self {
                    wallets: Arc::new(MemoryWalletStore::new()),
                    reservations: Arc::new(MemoryReservationStore::new()),
                    doctors: Arc::new(MemoryDoctorDirectory::new()),
                }
            }
        }
    }
}

impl Cells {
    pub fn build(config: Arc<AppConfig>) -> Self {
        let stores = Stores::for_backend(&config);

        let ledger = Arc::new(LedgerService::new(stores.wallets));
        let doctors = Arc::new(DoctorService::new(stores.doctors));

        let rooms: Arc<dyn VideoRoomProvider> = match VideoRoomClient::new(&config) {
            Ok(client) => Arc::new(client),
            Err(e) => {
                warn!("{}; falling back to unmanaged rooms", e);
                Arc::new(UnmanagedRooms::new(config.supabase_jwt_secret.clone()))
            }
        };

        let notifier: Arc<dyn Notifier> = match &config.notification_webhook_url {
            Some(url) if !url.is_empty() => Arc::new(WebhookNotifier::new(url.clone())),
            _ => Arc::new(LogNotifier),
        };

        let gateway = match PaymentGatewayClient::new(&config) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                warn!("{}; wallet top-ups are disabled", e);
                None
            }
        };

        let service = Arc::new(AppointmentService::new(
            stores.reservations,
            ledger.clone(),
            doctors.clone(),
            rooms,
            notifier,
            AppointmentPolicyConfig::from_config(&config),
        ));
        let sweeper = Arc::new(ExpirySweeper::new(service.clone(), doctors));

        Self {
            wallet: Arc::new(WalletState {
                config: config.clone(),
                ledger,
                gateway,
            }),
            appointments: Arc::new(AppointmentState {
                config: config.clone(),
                service,
                sweeper: sweeper.clone(),
            }),
            sweeper,
            config,
        }
    }
}
