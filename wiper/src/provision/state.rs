//! Provisioning states, triggers, and the checked transition graph.

use std::fmt;

use indexmap::IndexMap;

use crate::error::TransitionError;

/// Every state of a provisioning run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Start,
    ConnectCimc,
    CheckSol,
    ConfigureSol,
    CycleHost,
    ConnectApic,
    LogoutApic,
    LoginApic,
    PasswordLoginApic,
    EraseConfig,
    PressAnyKey,
    ProvideFabricName,
    ProvideControllerCount,
    ProvideControllerId,
    ProvideControllerName,
    ProvideTepAddressPool,
    ProvideInfraVlanId,
    ProvideMulticastPool,
    ProvideOobAddress,
    ProvideOobGateway,
    ProvideInterfaceSpeed,
    ProvideStrongPasswords,
    ProvideAdminPassword,
    ProvideModifyConfig,
}

impl State {
    /// All states, in declaration order.
    pub const ALL: [State; 24] = [
        State::Start,
        State::ConnectCimc,
        State::CheckSol,
        State::ConfigureSol,
        State::CycleHost,
        State::ConnectApic,
        State::LogoutApic,
        State::LoginApic,
        State::PasswordLoginApic,
        State::EraseConfig,
        State::PressAnyKey,
        State::ProvideFabricName,
        State::ProvideControllerCount,
        State::ProvideControllerId,
        State::ProvideControllerName,
        State::ProvideTepAddressPool,
        State::ProvideInfraVlanId,
        State::ProvideMulticastPool,
        State::ProvideOobAddress,
        State::ProvideOobGateway,
        State::ProvideInterfaceSpeed,
        State::ProvideStrongPasswords,
        State::ProvideAdminPassword,
        State::ProvideModifyConfig,
    ];

    /// The state's name as used in logs.
    pub fn name(self) -> &'static str {
        match self {
            State::Start => "start",
            State::ConnectCimc => "connect_cimc",
            State::CheckSol => "check_sol",
            State::ConfigureSol => "configure_sol",
            State::CycleHost => "cycle_host",
            State::ConnectApic => "connect_apic",
            State::LogoutApic => "logout_apic",
            State::LoginApic => "login_apic",
            State::PasswordLoginApic => "password_login_apic",
            State::EraseConfig => "eraseconfig",
            State::PressAnyKey => "press_any_key",
            State::ProvideFabricName => "provide_fabric_name",
            State::ProvideControllerCount => "provide_controller_count",
            State::ProvideControllerId => "provide_controller_id",
            State::ProvideControllerName => "provide_controller_name",
            State::ProvideTepAddressPool => "provide_tep_address_pool",
            State::ProvideInfraVlanId => "provide_infra_vlan_id",
            State::ProvideMulticastPool => "provide_multicast_pool",
            State::ProvideOobAddress => "provide_oob_address",
            State::ProvideOobGateway => "provide_oob_gateway",
            State::ProvideInterfaceSpeed => "provide_interface_speed",
            State::ProvideStrongPasswords => "provide_strong_passwords",
            State::ProvideAdminPassword => "provide_admin_password",
            State::ProvideModifyConfig => "provide_modify_config",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Named events that move the machine between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    Start,
    CimcPromptDetected,
    SolNotConfigured,
    SolConfigCommitted,
    ConnectToApic,
    CycleHost,
    ApicPromptDetected,
    ApicLoginDetected,
    ApicPasswordDetected,
    PressAnyKey,
    EnterFabricName,
    EnterControllerCount,
    EnterControllerId,
    EnterControllerName,
    EnterTepAddressPool,
    EnterInfraVlanId,
    EnterMulticastPool,
    EnterOobAddress,
    EnterOobGateway,
    EnterInterfaceSpeed,
    EnterStrongPasswords,
    EnterAdminPassword,
    ReenterAdminPassword,
    EnterEditConfig,
    RestartSetup,
}

impl Trigger {
    /// All triggers, in declaration order.
    pub const ALL: [Trigger; 25] = [
        Trigger::Start,
        Trigger::CimcPromptDetected,
        Trigger::SolNotConfigured,
        Trigger::SolConfigCommitted,
        Trigger::ConnectToApic,
        Trigger::CycleHost,
        Trigger::ApicPromptDetected,
        Trigger::ApicLoginDetected,
        Trigger::ApicPasswordDetected,
        Trigger::PressAnyKey,
        Trigger::EnterFabricName,
        Trigger::EnterControllerCount,
        Trigger::EnterControllerId,
        Trigger::EnterControllerName,
        Trigger::EnterTepAddressPool,
        Trigger::EnterInfraVlanId,
        Trigger::EnterMulticastPool,
        Trigger::EnterOobAddress,
        Trigger::EnterOobGateway,
        Trigger::EnterInterfaceSpeed,
        Trigger::EnterStrongPasswords,
        Trigger::EnterAdminPassword,
        Trigger::ReenterAdminPassword,
        Trigger::EnterEditConfig,
        Trigger::RestartSetup,
    ];

    /// The trigger's name as used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Trigger::Start => "start",
            Trigger::CimcPromptDetected => "cimc_prompt_detected",
            Trigger::SolNotConfigured => "sol_not_configured",
            Trigger::SolConfigCommitted => "sol_config_committed",
            Trigger::ConnectToApic => "connect_to_apic",
            Trigger::CycleHost => "cycle_host",
            Trigger::ApicPromptDetected => "apic_prompt_detected",
            Trigger::ApicLoginDetected => "apic_login_detected",
            Trigger::ApicPasswordDetected => "apic_password_detected",
            Trigger::PressAnyKey => "press_any_key",
            Trigger::EnterFabricName => "enter_fabric_name",
            Trigger::EnterControllerCount => "enter_controller_count",
            Trigger::EnterControllerId => "enter_controller_id",
            Trigger::EnterControllerName => "enter_controller_name",
            Trigger::EnterTepAddressPool => "enter_tep_address_pool",
            Trigger::EnterInfraVlanId => "enter_infra_vlan_id",
            Trigger::EnterMulticastPool => "enter_multicast_pool",
            Trigger::EnterOobAddress => "enter_oob_address",
            Trigger::EnterOobGateway => "enter_oob_gateway",
            Trigger::EnterInterfaceSpeed => "enter_interface_speed",
            Trigger::EnterStrongPasswords => "enter_strong_passwords",
            Trigger::EnterAdminPassword => "enter_admin_password",
            Trigger::ReenterAdminPassword => "reenter_admin_password",
            Trigger::EnterEditConfig => "enter_edit_config",
            Trigger::RestartSetup => "restart_setup",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One edge of the graph: a trigger is legal from any of `sources`.
#[derive(Debug, Clone, Copy)]
pub struct Transition {
    pub trigger: Trigger,
    pub sources: &'static [State],
    pub dest: State,
}

const fn edge(trigger: Trigger, sources: &'static [State], dest: State) -> Transition {
    Transition {
        trigger,
        sources,
        dest,
    }
}

use State as S;
use Trigger as T;

/// The full transition table.
///
/// A trigger may appear more than once when its destination depends on the
/// source: a shell prompt seen on first contact means a stale login to log
/// out of, while one seen after logging in means it is time to erase.
pub const TRANSITIONS: &[Transition] = &[
    edge(T::Start, &[S::Start], S::ConnectCimc),
    edge(T::CimcPromptDetected, &[S::ConnectCimc], S::CheckSol),
    edge(T::SolNotConfigured, &[S::CheckSol], S::ConfigureSol),
    edge(T::SolConfigCommitted, &[S::ConfigureSol], S::CheckSol),
    edge(T::ConnectToApic, &[S::CheckSol, S::LogoutApic], S::ConnectApic),
    edge(T::CycleHost, &[S::ConnectApic], S::CycleHost),
    edge(T::ApicPromptDetected, &[S::ConnectApic], S::LogoutApic),
    edge(
        T::ApicLoginDetected,
        &[S::ConnectApic, S::LogoutApic, S::PasswordLoginApic, S::CycleHost],
        S::LoginApic,
    ),
    edge(T::ApicPasswordDetected, &[S::ConnectApic, S::CycleHost], S::PasswordLoginApic),
    edge(T::ApicPromptDetected, &[S::LoginApic, S::CycleHost], S::EraseConfig),
    edge(T::PressAnyKey, &[S::ConnectApic, S::EraseConfig, S::CycleHost], S::PressAnyKey),
    edge(T::EnterFabricName, &[S::ConnectApic, S::PressAnyKey], S::ProvideFabricName),
    edge(
        T::EnterControllerCount,
        &[S::ConnectApic, S::ProvideFabricName],
        S::ProvideControllerCount,
    ),
    edge(
        T::EnterControllerId,
        &[S::ConnectApic, S::ProvideControllerCount],
        S::ProvideControllerId,
    ),
    edge(
        T::EnterControllerName,
        &[S::ConnectApic, S::ProvideControllerId],
        S::ProvideControllerName,
    ),
    edge(
        T::EnterTepAddressPool,
        &[S::ConnectApic, S::ProvideControllerName],
        S::ProvideTepAddressPool,
    ),
    edge(
        T::EnterInfraVlanId,
        &[S::ConnectApic, S::ProvideTepAddressPool],
        S::ProvideInfraVlanId,
    ),
    edge(
        T::EnterMulticastPool,
        &[S::ConnectApic, S::ProvideInfraVlanId],
        S::ProvideMulticastPool,
    ),
    edge(
        T::EnterOobAddress,
        &[S::ConnectApic, S::ProvideMulticastPool, S::ProvideInfraVlanId],
        S::ProvideOobAddress,
    ),
    edge(T::EnterOobGateway, &[S::ConnectApic, S::ProvideOobAddress], S::ProvideOobGateway),
    edge(
        T::EnterInterfaceSpeed,
        &[S::ConnectApic, S::ProvideOobGateway],
        S::ProvideInterfaceSpeed,
    ),
    edge(
        T::EnterStrongPasswords,
        &[S::ConnectApic, S::ProvideInterfaceSpeed],
        S::ProvideStrongPasswords,
    ),
    edge(
        T::EnterAdminPassword,
        &[S::ConnectApic, S::ProvideStrongPasswords],
        S::ProvideAdminPassword,
    ),
    edge(
        T::ReenterAdminPassword,
        &[S::ConnectApic, S::ProvideAdminPassword],
        S::ProvideAdminPassword,
    ),
    edge(
        T::EnterEditConfig,
        &[S::ConnectApic, S::ProvideAdminPassword, S::ProvideInterfaceSpeed],
        S::ProvideModifyConfig,
    ),
    edge(T::RestartSetup, &[S::ProvideModifyConfig], S::ProvideFabricName),
];

/// Tracks the current state and enforces the transition table.
#[derive(Debug)]
pub struct StateGraph {
    /// Edges grouped by trigger, in declaration order.
    edges: IndexMap<Trigger, Vec<Transition>>,

    /// Current state.
    current: State,
}

impl StateGraph {
    /// Create a graph at [`State::Start`].
    pub fn new() -> Self {
        Self::starting_at(State::Start)
    }

    /// Create a graph positioned at an arbitrary state.
    pub fn starting_at(current: State) -> Self {
        let mut edges: IndexMap<Trigger, Vec<Transition>> = IndexMap::new();
        for transition in TRANSITIONS {
            edges.entry(transition.trigger).or_default().push(*transition);
        }
        Self { edges, current }
    }

    /// The current state.
    pub fn current(&self) -> State {
        self.current
    }

    /// Where `trigger` would lead from the current state, if anywhere.
    pub fn destination(&self, trigger: Trigger) -> Option<State> {
        self.edges
            .get(&trigger)?
            .iter()
            .find(|t| t.sources.contains(&self.current))
            .map(|t| t.dest)
    }

    /// Fire `trigger`, moving to its destination.
    ///
    /// Fails without changing state when the current state is not one of
    /// the trigger's sources.
    pub fn fire(&mut self, trigger: Trigger) -> Result<State, TransitionError> {
        let dest = self.destination(trigger).ok_or(TransitionError {
            trigger,
            state: self.current,
        })?;
        self.current = dest;
        Ok(dest)
    }

    /// States `trigger` may fire from.
    pub fn sources(&self, trigger: Trigger) -> Vec<State> {
        self.edges
            .get(&trigger)
            .map(|edges| edges.iter().flat_map(|t| t.sources.iter().copied()).collect())
            .unwrap_or_default()
    }
}

impl Default for StateGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashSet, VecDeque};

    #[test]
    fn test_starts_at_start() {
        assert_eq!(StateGraph::new().current(), State::Start);
    }

    #[test]
    fn test_every_trigger_has_an_edge() {
        let graph = StateGraph::new();
        for trigger in Trigger::ALL {
            assert!(!graph.sources(trigger).is_empty(), "{trigger} has no edge");
        }
    }

    #[test]
    fn test_prompt_trigger_destination_depends_on_source() {
        let mut graph = StateGraph::starting_at(State::ConnectApic);
        assert_eq!(graph.fire(Trigger::ApicPromptDetected).unwrap(), State::LogoutApic);

        let mut graph = StateGraph::starting_at(State::LoginApic);
        assert_eq!(graph.fire(Trigger::ApicPromptDetected).unwrap(), State::EraseConfig);

        let mut graph = StateGraph::starting_at(State::CycleHost);
        assert_eq!(graph.fire(Trigger::ApicPromptDetected).unwrap(), State::EraseConfig);
    }

    #[test]
    fn test_illegal_trigger_leaves_state_unchanged() {
        let mut graph = StateGraph::starting_at(State::ProvideOobGateway);
        let err = graph.fire(Trigger::EnterEditConfig).unwrap_err();
        assert_eq!(err.trigger, Trigger::EnterEditConfig);
        assert_eq!(err.state, State::ProvideOobGateway);
        assert_eq!(graph.current(), State::ProvideOobGateway);
        assert_eq!(
            err.to_string(),
            "Trigger 'enter_edit_config' cannot fire from state 'provide_oob_gateway'"
        );
    }

    #[test]
    fn test_fire_agrees_with_sources_for_every_pair() {
        for state in State::ALL {
            for trigger in Trigger::ALL {
                let mut graph = StateGraph::starting_at(state);
                let allowed = graph.sources(trigger).contains(&state);
                match graph.fire(trigger) {
                    Ok(dest) => {
                        assert!(allowed, "{trigger} fired from {state}");
                        assert_eq!(graph.current(), dest);
                    }
                    Err(err) => {
                        assert!(!allowed, "{trigger} rejected from {state}");
                        assert_eq!(err.state, state);
                        assert_eq!(graph.current(), state);
                    }
                }
            }
        }
    }

    #[test]
    fn test_every_state_reachable_from_start() {
        let mut seen = HashSet::from([State::Start]);
        let mut queue = VecDeque::from([State::Start]);
        while let Some(state) = queue.pop_front() {
            let graph = StateGraph::starting_at(state);
            for trigger in Trigger::ALL {
                if let Some(dest) = graph.destination(trigger) {
                    if seen.insert(dest) {
                        queue.push_back(dest);
                    }
                }
            }
        }
        assert_eq!(seen.len(), State::ALL.len());
    }

    #[test]
    fn test_edit_config_cannot_skip_the_wizard() {
        for state in [
            State::ProvideFabricName,
            State::ProvideTepAddressPool,
            State::ProvideOobAddress,
            State::ProvideStrongPasswords,
        ] {
            let mut graph = StateGraph::starting_at(state);
            assert!(graph.fire(Trigger::EnterEditConfig).is_err());
        }
    }

    #[test]
    fn test_wizard_is_forward_only() {
        let mut graph = StateGraph::starting_at(State::ProvideFabricName);
        for trigger in [
            Trigger::EnterControllerCount,
            Trigger::EnterControllerId,
            Trigger::EnterControllerName,
            Trigger::EnterTepAddressPool,
            Trigger::EnterInfraVlanId,
            Trigger::EnterOobAddress,
            Trigger::EnterOobGateway,
            Trigger::EnterInterfaceSpeed,
            Trigger::EnterEditConfig,
            Trigger::RestartSetup,
        ] {
            graph.fire(trigger).unwrap();
        }
        assert_eq!(graph.current(), State::ProvideFabricName);
        assert!(graph.fire(Trigger::EnterTepAddressPool).is_err());
    }
}
