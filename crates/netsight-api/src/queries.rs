// GraphQL documents for the device inventory backend.
//
// The selection set is shared so bulk pages, subscription payloads and
// mutation results all deserialize into the same `DeviceRecord`.

/// Attributes requested for every device.
pub const DEVICE_FIELDS: &str = "
    id
    _createdAt
    _updatedAt
    adminClassified
    alarmCount
    assetSgt
    autoGroupSets
    avMatchScore
    avVendor
    behaviorState
    blacklistEnforceStatus
    classificationProfileId
    classificationScore
    classificationSource
    classificationState
    criticality
    currIpAddress
    currentUser
    customerName
    deviceCategory
    deviceDescr
    deviceStatusFlags
    deviceType
    deviceTypeImg
    dhcpHostname
    dhcpOptions
    dicomAETitle
    encMethod
    equipmentGuid
    firstSeen
    fqdn
    fwFlowBaselineEnforceStatus
    guestDevice
    hasAlarms
    incidentScore
    infobloxInfo
    iotEndpoint
    ipAddress
    isAgedOut
    isBlacklisted
    knownVulnRiskState
    lastIpUpdate
    lastSeen
    logoKey
    longMfgName
    macAddress
    mfgName
    modelNameNo
    openPorts
    osFamily
    osSource
    osSubFamily
    osType
    osVersion
    passwdScanMap
    portList
    profileGuid
    profileMfg
    resolvedProfile
    riskScore
    serialNo
    siteGuid
    subnet
    swFlowBaselineEnforceStatus
    swVersion
    tags
    tenantGuid
    useState
    vlan
    vlanName
    vulnIds
    whitelistStatus
";

/// Operation name of the bulk query, used for errors and logs.
pub const LIST_DEVICES_OPERATION: &str = "ListDevices";

/// Operation name of the create mutation.
pub const CREATE_DEVICE_OPERATION: &str = "CreateDevice";

/// Paginated bulk query: `listDevices(limit, nextToken) { items nextToken }`.
pub fn list_devices() -> String {
    format!(
        "query ListDevices($limit: Int, $nextToken: String) {{
  listDevices(limit: $limit, nextToken: $nextToken) {{
    items {{{DEVICE_FIELDS}    }}
    nextToken
  }}
}}"
    )
}

/// Create mutation: `createDevice(input) { ... }`.
pub fn create_device() -> String {
    format!(
        "mutation CreateDevice($input: CreateDeviceInput!) {{
  createDevice(input: $input) {{{DEVICE_FIELDS}  }}
}}"
    )
}

/// Subscription document for the given root field
/// (`onCreateDevice` / `onUpdateDevice`).
pub fn subscription(field: &str) -> String {
    let operation = capitalize(field);
    format!(
        "subscription {operation} {{
  {field} {{{DEVICE_FIELDS}  }}
}}"
    )
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
