//! The provisioning driver: one entry action per state.

use log::{debug, error, info, warn};
use secrecy::ExposeSecret;

use super::prompts;
use super::sol::SolStatus;
use super::state::{State, StateGraph, Trigger};
use super::{COMMIT_TIMEOUT, LOGIN_TIMEOUT, REBOOT_TIMEOUT, SOL_RETRY_DELAY};
use crate::channel::{PromptSet, Session, SessionKind};
use crate::config::TargetConfig;
use crate::driver::{SequenceBuilder, Step, run_branch, run_sequence, run_step};
use crate::error::{ChannelError, Error, Result, TransportError};
use crate::transport::Connector;

/// Drives one APIC from a bare CIMC login to a provisioned controller.
///
/// The provisioner owns the management session and the console-relay
/// session, both opened through the CIMC. Each state's entry action talks
/// to exactly one of them and names the trigger to fire next; [`run`]
/// fires it through the [`StateGraph`], so a prompt arriving out of order
/// ends the run with a [`TransitionError`](crate::error::TransitionError)
/// instead of being guessed around.
///
/// [`run`]: Provisioner::run
pub struct Provisioner<K: Connector> {
    config: TargetConfig,
    connector: K,
    graph: StateGraph,
    cimc: Option<Session<K::Channel>>,
    apic: Option<Session<K::Channel>>,

    /// The fabric name was typed during this run, so reaching the final
    /// question means every value on screen came from us.
    provided_fabric_name: bool,

    /// The host has already been power cycled once.
    power_cycled: bool,
}

impl<K: Connector> Provisioner<K> {
    /// Create a provisioner for one target; nothing is connected until [`run`].
    ///
    /// [`run`]: Provisioner::run
    pub fn new(config: TargetConfig, connector: K) -> Self {
        Self {
            config,
            connector,
            graph: StateGraph::new(),
            cimc: None,
            apic: None,
            provided_fabric_name: false,
            power_cycled: false,
        }
    }

    /// The current state.
    pub fn state(&self) -> State {
        self.graph.current()
    }

    /// The resolved target settings.
    pub fn config(&self) -> &TargetConfig {
        &self.config
    }

    /// Provision the APIC.
    ///
    /// Returns once the wizard has finished and the console shows its login
    /// prompt. Both sessions are closed whether or not the run succeeded.
    pub async fn run(&mut self) -> Result<()> {
        if self.config.simulator {
            warn!("Simulators are not supported, provisioning as an appliance.");
        }

        let result = self.drive(Trigger::Start).await;
        if let Err(e) = &result {
            error!("Provisioning stopped in state '{}': {e}", self.state());
        }
        self.close().await;
        result
    }

    /// Fire triggers until an entry action reports that the run is done.
    async fn drive(&mut self, first: Trigger) -> Result<()> {
        let mut trigger = first;
        loop {
            let from = self.graph.current();
            let state = self.graph.fire(trigger)?;
            debug!("{from} --{trigger}--> {state}");
            match self.enter(state).await? {
                Some(next) => trigger = next,
                None => return Ok(()),
            }
        }
    }

    async fn enter(&mut self, state: State) -> Result<Option<Trigger>> {
        match state {
            State::Start => Ok(Some(Trigger::Start)),
            State::ConnectCimc => self.connect_cimc().await,
            State::CheckSol => self.check_sol().await,
            State::ConfigureSol => self.configure_sol().await,
            State::CycleHost => self.cycle_host().await,
            State::ConnectApic => self.connect_apic().await,
            State::LogoutApic => self.logout_apic().await,
            State::LoginApic => self.login_apic().await,
            State::PasswordLoginApic => self.password_login_apic().await,
            State::EraseConfig => self.erase_config().await,
            State::PressAnyKey => self.press_any_key().await,
            State::ProvideFabricName => self.provide_fabric_name().await,
            State::ProvideControllerCount => self.provide_controller_count().await,
            State::ProvideControllerId => self.provide_controller_id().await,
            State::ProvideControllerName => self.provide_controller_name().await,
            State::ProvideTepAddressPool => self.provide_tep_address_pool().await,
            State::ProvideInfraVlanId => self.provide_infra_vlan_id().await,
            State::ProvideMulticastPool => self.provide_multicast_pool().await,
            State::ProvideOobAddress => self.provide_oob_address().await,
            State::ProvideOobGateway => self.provide_oob_gateway().await,
            State::ProvideInterfaceSpeed => self.provide_interface_speed().await,
            State::ProvideStrongPasswords => self.provide_strong_passwords().await,
            State::ProvideAdminPassword => self.provide_admin_password().await,
            State::ProvideModifyConfig => self.provide_modify_config().await,
        }
    }

    fn cimc(&mut self) -> Result<&mut Session<K::Channel>> {
        self.cimc
            .as_mut()
            .ok_or(ChannelError::NotConnected(SessionKind::Cimc).into())
    }

    fn apic(&mut self) -> Result<&mut Session<K::Channel>> {
        self.apic
            .as_mut()
            .ok_or(ChannelError::NotConnected(SessionKind::Apic).into())
    }

    async fn close(&mut self) {
        info!("Disconnecting from both CIMC and the APIC by closing the connections.");
        for mut session in [self.cimc.take(), self.apic.take()].into_iter().flatten() {
            if let Err(e) = session.close().await {
                warn!("Failed to close the {} session: {e}", session.kind());
            }
        }
    }

    // Phase A: CIMC

    async fn connect_cimc(&mut self) -> Result<Option<Trigger>> {
        for kind in [SessionKind::Cimc, SessionKind::Apic] {
            let channel = self.connector.connect(kind).await.inspect_err(|e| {
                if let Error::Transport(TransportError::AuthenticationFailed { .. }) = e {
                    error!(
                        "Unable to connect to CIMC {}: check the CIMC username and password.",
                        self.config.cimc_ip
                    );
                }
            })?;
            let session = Some(Session::new(channel, kind));
            match kind {
                SessionKind::Cimc => self.cimc = session,
                SessionKind::Apic => self.apic = session,
            }
        }

        let step = Step::new("", prompts::CIMC)?;
        for kind in [SessionKind::Cimc, SessionKind::Apic] {
            let session = match kind {
                SessionKind::Cimc => self.cimc()?,
                SessionKind::Apic => self.apic()?,
            };
            run_step(session, &step).await?;
            session.clear();
        }
        Ok(Some(Trigger::CimcPromptDetected))
    }

    async fn check_sol(&mut self) -> Result<Option<Trigger>> {
        info!("Ensuring Serial Over LAN is configured properly.");
        let step = Step::new("show sol", prompts::CIMC)?;
        loop {
            let cimc = self.cimc()?;
            run_step(cimc, &step).await?;
            match SolStatus::parse(cimc.output()) {
                Ok(status) if status.is_configured() => {
                    info!("Serial Over LAN is configured.");
                    return Ok(Some(Trigger::ConnectToApic));
                }
                Ok(status) => {
                    warn!(
                        "Serial Over LAN reports enabled={}, baud rate={}, com port={}; \
                         reconfiguring in {:?}.",
                        status.enabled, status.baud_rate, status.com_port, SOL_RETRY_DELAY
                    );
                    tokio::time::sleep(SOL_RETRY_DELAY).await;
                    info!("Serial Over LAN is not configured, moving to configure it.");
                    return Ok(Some(Trigger::SolNotConfigured));
                }
                Err(e) => {
                    warn!("The command output for 'show sol' was not valid, trying again.");
                    debug!("{e}");
                }
            }
        }
    }

    async fn configure_sol(&mut self) -> Result<Option<Trigger>> {
        let steps = SequenceBuilder::new()
            .send("scope sol")
            .expect(prompts::CIMC_SOL_SCOPE)?
            .send("set baud-rate 115200")
            .expect(prompts::CIMC_SOL_UNCOMMITTED)?
            .send("set comport com0")
            .expect(prompts::CIMC_SOL_UNCOMMITTED)?
            .send("set enabled yes")
            .expect(prompts::CIMC_SOL_UNCOMMITTED)?
            .send("commit")
            .with_timeout(COMMIT_TIMEOUT)
            .expect(prompts::CIMC_SOL_SCOPE)?
            .send("top")
            .expect(prompts::CIMC_TOP)?
            .build();
        run_sequence(self.cimc()?, &steps).await?;
        info!("Serial Over LAN configuration committed.");
        Ok(Some(Trigger::SolConfigCommitted))
    }

    // Phase B: console

    async fn connect_apic(&mut self) -> Result<Option<Trigger>> {
        info!(
            "Trying to connect to the APIC console via Serial Over LAN, \
             using a timeout of 10 seconds."
        );
        let prompts = first_contact_prompts(true)?;
        let step = Step::with_patterns("connect host", Vec::new());
        match run_branch(self.apic()?, step, &prompts).await {
            Ok(trigger) => Ok(Some(trigger)),
            Err(e) if e.is_timeout() && !self.power_cycled => {
                warn!("No prompt seen from the APIC, will try to power cycle the host.");
                Ok(Some(Trigger::CycleHost))
            }
            Err(e) => Err(e),
        }
    }

    async fn cycle_host(&mut self) -> Result<Option<Trigger>> {
        self.power_cycled = true;
        let steps = SequenceBuilder::new()
            .send("scope chassis")
            .expect(prompts::CIMC_CHASSIS_SCOPE)?
            .send("power cycle")
            .expect(prompts::CIMC_POWER_CYCLE_CONFIRM)?
            .send("y")
            .expect(prompts::CIMC_CHASSIS_SCOPE)?
            .send("top")
            .expect(prompts::CIMC_TOP)?
            .build();
        info!("Sending APIC power cycle commands to CIMC.");
        run_sequence(self.cimc()?, &steps).await?;

        info!("Waiting on a power cycle for up to {} seconds.", REBOOT_TIMEOUT.as_secs());
        let prompts = first_contact_prompts(false)?;
        let apic = self.apic()?;
        apic.clear();
        match apic.expect(&prompts.patterns(), REBOOT_TIMEOUT).await {
            Ok(index) => Ok(prompts.outcome(index)),
            Err(e) => {
                error!("Unable to get a response from the controller after a power cycle.");
                error!(
                    "Please verify that the controller software is installed correctly \
                     and that the controller boots up fine."
                );
                Err(e)
            }
        }
    }

    async fn logout_apic(&mut self) -> Result<Option<Trigger>> {
        info!("Found a CLI prompt on the APIC, logging out.");
        run_step(self.apic()?, &Step::new("exit", prompts::LOGIN)?).await?;
        Ok(Some(Trigger::ApicLoginDetected))
    }

    async fn login_apic(&mut self) -> Result<Option<Trigger>> {
        info!("Found a login prompt on the APIC, logging in as 'rescue-user'.");
        let login = Step::any_of("rescue-user", &[prompts::PASSWORD, prompts::SHELL_AFTER_LOGIN])?;
        if run_step(self.apic()?, &login).await? == 0 {
            info!("Rescue-user was prompted for a password, sending the APIC admin password.");
            // The unit may still be booting.
            let password = Step::new(self.admin_password(), prompts::SHELL_AFTER_LOGIN)?
                .hidden()
                .with_timeout(LOGIN_TIMEOUT);
            run_step(self.apic()?, &password).await?;
        } else {
            info!("Found a CLI prompt on the APIC.");
        }
        Ok(Some(Trigger::ApicPromptDetected))
    }

    async fn password_login_apic(&mut self) -> Result<Option<Trigger>> {
        info!("Login was already started, sending ctrl-d to start over.");
        run_step(self.apic()?, &Step::new("\x04", prompts::LOGIN)?).await?;
        Ok(Some(Trigger::ApicLoginDetected))
    }

    async fn erase_config(&mut self) -> Result<Option<Trigger>> {
        info!("Sending 'eraseconfig setup' command to the APIC.");
        let erase = Step::new("eraseconfig setup", prompts::ERASE_CONFIRM)?;
        run_step(self.apic()?, &erase).await?;

        info!(
            "Sending 'Y' to continue with the eraseconfig setup, will wait for the reboot, \
             timeout is {} seconds.",
            REBOOT_TIMEOUT.as_secs()
        );
        let confirm = Step::new("Y", prompts::PRESS_ANY_KEY)?.with_timeout(REBOOT_TIMEOUT);
        run_step(self.apic()?, &confirm).await?;
        Ok(Some(Trigger::PressAnyKey))
    }

    async fn press_any_key(&mut self) -> Result<Option<Trigger>> {
        info!("Starting the setup script on the APIC.");
        run_step(self.apic()?, &Step::new("", prompts::FABRIC_NAME)?).await?;
        Ok(Some(Trigger::EnterFabricName))
    }

    // Phase C: setup wizard

    /// Type one answer and report whichever wizard prompt follows it.
    ///
    /// Every field prompt is listened for, not just the expected next one,
    /// so a repeated or skipped field fires a trigger the graph rejects.
    async fn answer(&mut self, step: Step) -> Result<Option<Trigger>> {
        let prompts = wizard_prompts()?;
        let trigger = run_branch(self.apic()?, step, &prompts).await?;
        Ok(Some(trigger))
    }

    async fn provide_fabric_name(&mut self) -> Result<Option<Trigger>> {
        let name = self.config.fabric_name.clone();
        info!("Setting the fabric name to '{name}' on the APIC.");
        let next = self.answer(Step::with_patterns(name, Vec::new())).await?;
        self.provided_fabric_name = true;
        Ok(next)
    }

    async fn provide_controller_count(&mut self) -> Result<Option<Trigger>> {
        let count = self.config.number_of_controllers.to_string();
        info!("Setting number of controllers to '{count}' on the APIC.");
        self.answer(Step::with_patterns(count, Vec::new())).await
    }

    async fn provide_controller_id(&mut self) -> Result<Option<Trigger>> {
        let id = self.config.controller_number.to_string();
        info!("Setting the controller id to '{id}' on the APIC.");
        self.answer(Step::with_patterns(id, Vec::new())).await
    }

    async fn provide_controller_name(&mut self) -> Result<Option<Trigger>> {
        let name = self.config.controller_name.clone();
        info!("Setting the controller name to '{name}' on the APIC.");
        self.answer(Step::with_patterns(name, Vec::new())).await
    }

    async fn provide_tep_address_pool(&mut self) -> Result<Option<Trigger>> {
        let pool = self.config.tep_address_pool.clone();
        info!("Setting the TEP address pool to '{pool}' on the APIC.");
        self.answer(Step::with_patterns(pool, Vec::new())).await
    }

    async fn provide_infra_vlan_id(&mut self) -> Result<Option<Trigger>> {
        let vlan = self.config.infra_vlan_id.clone();
        info!("Setting the infra VLAN ID to '{vlan}' on the APIC.");
        // Only the first controller is asked for the multicast pool.
        self.answer(Step::with_patterns(vlan, Vec::new())).await
    }

    async fn provide_multicast_pool(&mut self) -> Result<Option<Trigger>> {
        let pool = self.config.bd_mc_addresses.clone();
        info!("Setting the BD multicast address pool to '{pool}' on the APIC.");
        self.answer(Step::with_patterns(pool, Vec::new())).await
    }

    async fn provide_oob_address(&mut self) -> Result<Option<Trigger>> {
        let address = self.config.oob_ip_address.clone();
        info!("Setting the out-of-band IP address to {address} on the APIC.");
        self.answer(Step::with_patterns(address, Vec::new())).await
    }

    async fn provide_oob_gateway(&mut self) -> Result<Option<Trigger>> {
        let gateway = self.config.oob_default_gateway.clone();
        info!("Setting the out-of-band default gateway to {gateway} on the APIC.");
        self.answer(Step::with_patterns(gateway, Vec::new())).await
    }

    async fn provide_interface_speed(&mut self) -> Result<Option<Trigger>> {
        let speed = self.config.int_speed.clone();
        info!("Setting the out-of-band interface speed/duplex to {speed} on the APIC.");
        // Only the first controller chooses the password policy.
        self.answer(Step::with_patterns(speed, Vec::new())).await
    }

    async fn provide_strong_passwords(&mut self) -> Result<Option<Trigger>> {
        let answer = self.config.strong_passwords.clone();
        info!("Sending '{answer}' for enabling strong passwords on the APIC.");
        self.answer(Step::with_patterns(answer, Vec::new())).await
    }

    async fn provide_admin_password(&mut self) -> Result<Option<Trigger>> {
        info!("Setting the admin password on the APIC.");
        let step = Step::with_patterns(self.admin_password(), Vec::new()).hidden();
        let next = self.answer(step).await?;
        if next != Some(Trigger::ReenterAdminPassword) {
            return Ok(next);
        }

        info!("Resending the admin password to the APIC.");
        let again = Step::with_patterns(self.admin_password(), Vec::new()).hidden();
        self.answer(again).await
    }

    // Phase D: completion

    async fn provide_modify_config(&mut self) -> Result<Option<Trigger>> {
        if self.provided_fabric_name {
            info!(
                "Completed a full setup script attempt, waiting for the APIC login prompt \
                 for up to {} seconds.",
                LOGIN_TIMEOUT.as_secs()
            );
            let done = Step::new("n", prompts::LOGIN)?.with_timeout(LOGIN_TIMEOUT);
            run_step(self.apic()?, &done).await?;
            info!("The APIC has been provisioned.");
            Ok(None)
        } else {
            // Found mid-wizard: the values on screen were not typed by this run.
            info!("Restarting the setup script to enter every value.");
            run_step(self.apic()?, &Step::new("y", prompts::FABRIC_NAME)?).await?;
            Ok(Some(Trigger::RestartSetup))
        }
    }

    fn admin_password(&self) -> String {
        self.config.apic_admin_password.expose_secret().to_string()
    }
}

fn prompt_set(entries: &[(&str, Trigger)]) -> Result<PromptSet<Trigger>> {
    PromptSet::new(entries.iter().copied())
        .map_err(|e| ChannelError::InvalidPattern(e).into())
}

const LOGIN_PROMPTS: [(&str, Trigger); 4] = [
    (prompts::LOGIN, Trigger::ApicLoginDetected),
    (prompts::PASSWORD, Trigger::ApicPasswordDetected),
    (prompts::SHELL, Trigger::ApicPromptDetected),
    (prompts::PRESS_ANY_KEY, Trigger::PressAnyKey),
];

/// Setup wizard prompts, in the order the wizard asks them.
const WIZARD_PROMPTS: [(&str, Trigger); 14] = [
    (prompts::FABRIC_NAME, Trigger::EnterFabricName),
    (prompts::CONTROLLER_COUNT, Trigger::EnterControllerCount),
    (prompts::CONTROLLER_ID, Trigger::EnterControllerId),
    (prompts::CONTROLLER_NAME, Trigger::EnterControllerName),
    (prompts::TEP_ADDRESS_POOL, Trigger::EnterTepAddressPool),
    (prompts::INFRA_VLAN_ID, Trigger::EnterInfraVlanId),
    (prompts::MULTICAST_POOL, Trigger::EnterMulticastPool),
    (prompts::OOB_ADDRESS, Trigger::EnterOobAddress),
    (prompts::OOB_GATEWAY, Trigger::EnterOobGateway),
    (prompts::INTERFACE_SPEED, Trigger::EnterInterfaceSpeed),
    (prompts::STRONG_PASSWORDS, Trigger::EnterStrongPasswords),
    (prompts::ADMIN_PASSWORD, Trigger::EnterAdminPassword),
    (prompts::REENTER_ADMIN_PASSWORD, Trigger::ReenterAdminPassword),
    (prompts::EDIT_CONFIG, Trigger::EnterEditConfig),
];

fn wizard_prompts() -> Result<PromptSet<Trigger>> {
    prompt_set(&WIZARD_PROMPTS)
}

/// Everything the console can show when first reached.
///
/// A freshly booted unit cannot be mid-wizard, so the wizard fields are left
/// out after a power cycle.
fn first_contact_prompts(include_wizard: bool) -> Result<PromptSet<Trigger>> {
    let mut entries = LOGIN_PROMPTS.to_vec();
    if include_wizard {
        entries.extend(WIZARD_PROMPTS);
    }
    prompt_set(&entries)
}
