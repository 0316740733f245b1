mod performance;
